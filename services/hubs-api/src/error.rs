//! Service-specific error types

use thiserror::Error;

/// Failure of the token refresh sub-flow, tagged by the step that failed.
///
/// Never surfaces to the caller: the `/hubs` route logs it and still replies
/// `"401 - Unauthorized"`.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("failed to retrieve app secrets: {0}")]
    Secrets(forge_auth::Error),

    #[error("failed to issue access token: {0}")]
    Issue(forge_auth::Error),

    #[error("failed to store access token: {0}")]
    Store(token_store::StoreError),
}

impl RefreshError {
    /// Metric label for the failed step
    pub fn stage(&self) -> &'static str {
        match self {
            RefreshError::Secrets(_) => "secrets_failed",
            RefreshError::Issue(_) => "issue_failed",
            RefreshError::Store(_) => "store_failed",
        }
    }
}
