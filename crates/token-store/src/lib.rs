//! Persistence for the active Forge access token
//!
//! The token table holds at most one live record, keyed by
//! `(AccessToken, ExpiresAt)`. The hubs service writes a record after each
//! refresh and deletes it right after using it once. Deleting a key that is
//! not present is a successful no-op on every backend.
//!
//! Backends:
//! - [`DynamoTokenStore`]: DynamoDB `PutItem` / `DeleteItem` (production)
//! - [`FileTokenStore`]: JSON file with atomic writes (local development)
//! - [`MemoryTokenStore`]: in-process set (tests, demos)

pub mod dynamo;
pub mod file;
pub mod memory;

pub use dynamo::DynamoTokenStore;
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use common::TokenRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Default DynamoDB table holding the active token
pub const DEFAULT_TABLE_NAME: &str = "ForgeAuthSession";

/// Attribute names of the persisted item
pub const ACCESS_TOKEN_ATTR: &str = "AccessToken";
pub const EXPIRES_AT_ATTR: &str = "ExpiresAt";

/// Errors from token store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open token store: {0}")]
    Open(String),

    #[error("failed to write token: {0}")]
    Write(String),

    #[error("failed to delete token: {0}")]
    Delete(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Boxed future returned by [`TokenStore`], dyn-compatible for `Arc<dyn TokenStore>`.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Composite key of a stored token, which is also the whole persisted item:
/// `{ "AccessToken": "...", "ExpiresAt": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "ExpiresAt")]
    pub expires_at: String,
}

impl TokenKey {
    /// Build a key from authorizer context values.
    ///
    /// `auth_token` is usually the raw `Authorization` value; a leading
    /// `"Bearer "` is stripped.
    pub fn new(auth_token: &str, expires_at: &str) -> Self {
        let access_token = auth_token.strip_prefix("Bearer ").unwrap_or(auth_token);
        Self {
            access_token: access_token.to_owned(),
            expires_at: expires_at.to_owned(),
        }
    }

    pub fn from_record(record: &TokenRecord) -> Self {
        Self {
            access_token: record.access_token.expose().clone(),
            expires_at: record.expires_at_attr(),
        }
    }
}

/// Single-row key-value persistence for the active access token.
pub trait TokenStore: Send + Sync {
    /// Identifier for logging (e.g. "dynamodb", "file", "memory")
    fn id(&self) -> &str;

    /// Insert or replace the record.
    fn save<'a>(&'a self, record: &'a TokenRecord) -> StoreFuture<'a, ()>;

    /// Remove the record with this key. Absent keys are not an error.
    fn delete(&self, key: TokenKey) -> StoreFuture<'_, ()>;
}
