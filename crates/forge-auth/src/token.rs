//! Two-legged OAuth token issuance
//!
//! POSTs a `client_credentials` grant to the token endpoint, authenticating
//! with HTTP Basic (client id / client secret). The response is turned into
//! a `TokenRecord` with an absolute expiry in unix milliseconds.

use common::{TokenRecord, unix_millis};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::AuthFuture;
use crate::constants::{DEFAULT_SCOPES, TOKEN_ENDPOINT};
use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Response body from the token endpoint.
///
/// The endpoint returns `expires_in` (seconds delta). Some gateways and SDK
/// wrappers also return an absolute `expires_at`; when present it wins.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl TokenResponse {
    /// Convert into a record, resolving the expiry against `now_millis`.
    pub fn into_record(self, now_millis: u64) -> Result<TokenRecord> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at,
            (None, Some(delta)) => delta
                .checked_mul(1000)
                .and_then(|ms| now_millis.checked_add(ms))
                .ok_or_else(|| Error::AuthProvider("expires_in out of range".into()))?,
            (None, None) => {
                return Err(Error::AuthProvider(
                    "token response has neither expires_at nor expires_in".into(),
                ));
            }
        };
        Ok(TokenRecord::new(self.access_token, expires_at))
    }
}

/// Exchanges app credentials for an access token.
pub trait TokenIssuer: Send + Sync {
    fn issue_token<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, TokenRecord>;
}

/// Token issuer for the Forge authentication API.
#[derive(Debug, Clone)]
pub struct ForgeTokenIssuer {
    client: reqwest::Client,
    token_url: String,
    scopes: Vec<String>,
}

impl ForgeTokenIssuer {
    /// Issuer against the public token endpoint with the read-only scopes.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(
            client,
            TOKEN_ENDPOINT,
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_endpoint(
        client: reqwest::Client,
        token_url: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            scopes,
        }
    }

    /// Space-separated scope string sent with the grant
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    #[instrument(skip_all, fields(client_id = %credentials.client_id))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenRecord> {
        let scope = self.scope();
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &credentials.client_id,
                Some(credentials.client_secret.expose()),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", scope.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "token request failed");
                Error::Http(format!("token request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            error!(%status, body = %body, "error retrieving credentials");
            return Err(Error::AuthProvider(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::AuthProvider(format!("invalid token response: {e}")))?;

        let record = token.into_record(unix_millis())?;
        info!(expires_at = record.expires_at, "authenticated to the Forge app");
        Ok(record)
    }
}

impl TokenIssuer for ForgeTokenIssuer {
    fn issue_token<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, TokenRecord> {
        Box::pin(self.authenticate(credentials))
    }
}
