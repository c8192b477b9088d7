//! Common types for the Forge hubs service
//!
//! Shared by the auth client, the token store and the HTTP service: the
//! redacting [`Secret`] wrapper, the [`TokenRecord`] that flows from the
//! issuer into the store, and the configuration error type.

mod error;
mod secret;
mod token;

pub use error::{Error, Result};
pub use secret::Secret;
pub use token::{TokenRecord, unix_millis};
