//! Error types for secret retrieval and token issuance

/// Errors from the secret store and the token endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token endpoint rejected the request: {0}")]
    AuthProvider(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("invalid secret store request: {0}")]
    InvalidRequest(String),

    #[error("invalid secret store parameter: {0}")]
    InvalidParameter(String),

    #[error("unexpected secret format: {0}")]
    SecretMalformed(String),

    #[error("secret store error: {0}")]
    SecretStore(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
