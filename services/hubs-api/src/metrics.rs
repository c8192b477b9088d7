//! Prometheus metrics exposition
//!
//! - `hubs_requests_total` (counter): label `outcome`
//! - `hubs_request_duration_seconds` (histogram): label `outcome`
//! - `token_refresh_total` (counter): label `result`
//! - `token_store_errors_total` (counter): label `operation`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries for request duration: 5ms up to the 60s client timeout ceiling.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Counters surfaced on `/health`.
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    /// `/hubs` requests that did not end with hub data
    pub errors_total: Arc<AtomicU64>,
    /// Requests currently inside the `/hubs` flow, reported on drain timeout
    pub in_flight: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Count a request as in flight until the returned guard is dropped.
    ///
    /// The decrement runs even when the handler future is dropped early,
    /// e.g. on client disconnect.
    pub fn track_in_flight(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard(self.in_flight.clone())
    }
}

pub struct InFlightGuard(Arc<AtomicU64>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("hubs_request_duration_seconds".to_string()),
        DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Explicit buckets make the duration metric render as a histogram
/// (`_bucket` lines) rather than a summary.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a finished `/hubs` request.
pub fn record_hubs_request(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("hubs_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("hubs_request_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// Record a refresh attempt: `stored` or the failed stage.
pub fn record_token_refresh(result: &'static str) {
    metrics::counter!("token_refresh_total", "result" => result).increment(1);
}

/// Record a failed token store call (`save` or `delete`).
pub fn record_store_error(operation: &'static str) {
    metrics::counter!("token_store_errors_total", "operation" => operation).increment(1);
}
