//! Access token record shared by the issuer and the token store

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Secret;

/// A bearer access token and its absolute expiry.
///
/// `expires_at` is a unix timestamp in milliseconds. The token table stores
/// it as a string, see [`TokenRecord::expires_at_attr`].
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub access_token: Secret<String>,
    pub expires_at: u64,
}

impl TokenRecord {
    pub fn new(access_token: impl Into<String>, expires_at: u64) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            expires_at,
        }
    }

    /// Expiry in the string form persisted as `ExpiresAt`
    pub fn expires_at_attr(&self) -> String {
        self.expires_at.to_string()
    }
}

/// Current time as unix milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
