//! Token refresh sub-flow
//!
//! secrets → issue → save, stopping at the first failing step. Runs once per
//! upstream 401; there is no retry.

use common::TokenRecord;
use forge_auth::{SecretSource, TokenIssuer};
use token_store::TokenStore;
use tracing::{info, instrument};

use crate::error::RefreshError;

/// Fetch the app credentials, issue a new token and persist it.
#[instrument(skip_all, fields(secrets = secrets.id(), store = store.id()))]
pub async fn refresh_token(
    secrets: &dyn SecretSource,
    issuer: &dyn TokenIssuer,
    store: &dyn TokenStore,
) -> Result<TokenRecord, RefreshError> {
    let credentials = secrets
        .fetch_credentials()
        .await
        .map_err(RefreshError::Secrets)?;
    info!("retrieved app secrets");

    let record = issuer
        .issue_token(&credentials)
        .await
        .map_err(RefreshError::Issue)?;

    store.save(&record).await.map_err(RefreshError::Store)?;
    info!(expires_at = record.expires_at, "stored new Forge credentials");

    Ok(record)
}
