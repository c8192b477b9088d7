//! Forge hubs API client
//!
//! Issues `GET /project/v1/hubs` with the caller's bearer header and
//! classifies the outcome. Network failures are logged and folded into
//! `HubsFetch::Failed`; nothing here returns an error.

use tracing::{error, info, warn};

/// Why a hubs fetch did not produce hub data
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// Upstream answered with a status other than 2xx or 401
    Status(u16),
    /// Upstream answered 2xx but the body was not JSON
    Body(String),
    /// The request never got a response (DNS, connect, timeout)
    Network(String),
}

/// Outcome of one hubs fetch
#[derive(Debug, Clone, PartialEq)]
pub enum HubsFetch {
    Hubs(serde_json::Value),
    Unauthorized,
    Failed(FetchFailure),
}

impl HubsFetch {
    /// Whether upstream saw the token, i.e. an HTTP response came back.
    pub fn reached_upstream(&self) -> bool {
        !matches!(self, HubsFetch::Failed(FetchFailure::Network(_)))
    }
}

/// HTTP client for the hubs endpoint.
///
/// The request timeout is the one configured on the shared `reqwest::Client`.
#[derive(Clone)]
pub struct HubFetcher {
    client: reqwest::Client,
    hubs_url: String,
}

impl HubFetcher {
    pub fn new(client: reqwest::Client, hubs_url: impl Into<String>) -> Self {
        Self {
            client,
            hubs_url: hubs_url.into(),
        }
    }

    /// Fetch hubs using `auth_header` verbatim as the `Authorization` value.
    pub async fn fetch(&self, auth_header: &str) -> HubsFetch {
        let response = match self
            .client
            .get(&self.hubs_url)
            .header(reqwest::header::AUTHORIZATION, auth_header)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, url = %self.hubs_url, "failed to get hubs");
                return HubsFetch::Failed(FetchFailure::Network(e.to_string()));
            }
        };

        let status = response.status();
        info!(status = status.as_u16(), "GET hubs response");

        if status.is_success() {
            return match response.json::<serde_json::Value>().await {
                Ok(body) => HubsFetch::Hubs(body),
                Err(e) => {
                    error!(error = %e, "hubs response body is not valid JSON");
                    HubsFetch::Failed(FetchFailure::Body(e.to_string()))
                }
            };
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("hubs request unauthorized");
            return HubsFetch::Unauthorized;
        }

        error!(status = status.as_u16(), "failed to get hubs");
        HubsFetch::Failed(FetchFailure::Status(status.as_u16()))
    }
}
