//! Forge (Autodesk Platform Services) authentication library
//!
//! Fetches the app's client id/secret from a secret store and exchanges them
//! for a two-legged (client credentials) access token. Both collaborators sit
//! behind traits so the HTTP service can be tested with fakes.
//!
//! Refresh flow, as driven by the hubs service:
//! 1. `SecretSource::fetch_credentials()` reads the single-key secret
//! 2. `TokenIssuer::issue_token()` posts to the token endpoint
//! 3. The resulting `common::TokenRecord` is handed to the token store

pub mod constants;
pub mod credentials;
pub mod error;
pub mod secrets_manager;
pub mod token;

use std::future::Future;
use std::pin::Pin;

pub use constants::*;
pub use credentials::{Credentials, EnvSecretSource, SecretSource, parse_secret_string};
pub use error::{Error, Result};
pub use secrets_manager::SecretsManagerSource;
pub use token::{ForgeTokenIssuer, TokenIssuer, TokenResponse};

/// Boxed future returned by the auth traits, dyn-compatible for `Arc<dyn _>`.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;
