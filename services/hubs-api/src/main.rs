//! Forge hubs service
//!
//! Single-binary Rust service that:
//! 1. Serves a welcome page on `/`
//! 2. Lists Forge hubs on `/hubs` using the token forwarded by the authorizer
//! 3. Deletes each token after one use and mints a replacement on upstream 401

mod authorizer;
mod config;
mod error;
mod flow;
mod hubs;
mod metrics;
mod refresh;
mod routes;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use forge_auth::{EnvSecretSource, ForgeTokenIssuer, SecretSource, SecretsManagerSource};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use token_store::{DynamoTokenStore, FileTokenStore, MemoryTokenStore, TokenStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::authorizer::AuthorizerContext;
use crate::config::{Config, SecretsBackend, StoreBackend};
use crate::hubs::HubFetcher;
use crate::metrics::ServiceMetrics;
use crate::routes::HubsState;

/// How long in-flight requests may run after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    hubs: HubsState,
    metrics: ServiceMetrics,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps concurrent requests across all routes.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(routes::root_handler))
        .route("/hubs", get(hubs_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting forge-hubs");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        hubs_url = %config.forge.hubs_url,
        secrets_backend = ?config.secrets.backend,
        store_backend = ?config.token_store.backend,
        status_codes = ?config.server.status_codes,
        "configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.forge.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let hubs_state = build_hubs_state(&config, client).await?;
    let metrics = ServiceMetrics::new();

    let app_state = AppState {
        hubs: hubs_state,
        metrics: metrics.clone(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    let in_flight = metrics.in_flight.clone();

    // The drain timer starts at signal receipt: notify the server to drain,
    // then race the drain against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Select the secret source and token store backends named in the config.
async fn build_hubs_state(config: &Config, client: reqwest::Client) -> Result<HubsState> {
    let secrets: Arc<dyn SecretSource> = match config.secrets.backend {
        SecretsBackend::SecretsManager => {
            let secret_name = config
                .secrets
                .secret_name
                .clone()
                .context("secrets.secret_name is required for the secrets_manager backend")?;
            Arc::new(
                SecretsManagerSource::connect(
                    &config.secrets.region,
                    config.secrets.endpoint_url.as_deref(),
                    secret_name,
                )
                .await,
            )
        }
        SecretsBackend::Env => Arc::new(EnvSecretSource::default()),
    };

    let store: Arc<dyn TokenStore> = match config.token_store.backend {
        StoreBackend::Dynamodb => Arc::new(
            DynamoTokenStore::connect(
                &config.token_store.region,
                config.token_store.endpoint_url.as_deref(),
                Some(config.token_store.table_name.as_str()),
            )
            .await,
        ),
        StoreBackend::File => {
            let path = config
                .token_store
                .path
                .clone()
                .context("token_store.path is required for the file backend")?;
            Arc::new(
                FileTokenStore::open(path)
                    .await
                    .context("failed to open token file")?,
            )
        }
        StoreBackend::Memory => {
            warn!("memory token store selected; tokens are lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
    };

    let issuer = ForgeTokenIssuer::with_endpoint(
        client.clone(),
        &config.forge.token_url,
        config.forge.scopes.clone(),
    );

    Ok(HubsState {
        fetcher: HubFetcher::new(client, &config.forge.hubs_url),
        secrets,
        issuer: Arc::new(issuer),
        store,
        status_codes: config.server.status_codes,
    })
}

/// `/hubs`: run the flow for this request and render its reply.
async fn hubs_handler(State(state): State<AppState>, context: AuthorizerContext) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let start = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    let _in_flight = state.metrics.track_in_flight();

    let reply = routes::run_hubs_flow(&state.hubs, context, &request_id).await;

    if !matches!(reply, flow::HubsReply::Hubs(_)) {
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    metrics::record_hubs_request(reply.outcome(), start.elapsed().as_secs_f64());

    routes::reply_response(reply, state.hubs.status_codes)
}

/// Health endpoint: JSON with status, uptime and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
