//! Forge API endpoints and OAuth scopes
//!
//! Defaults only; every URL can be overridden in the service configuration.

/// Data Management endpoint listing the hubs visible to the app
pub const HUBS_ENDPOINT: &str = "https://developer.api.autodesk.com/project/v1/hubs";

/// Two-legged token endpoint (client credentials grant)
pub const TOKEN_ENDPOINT: &str = "https://developer.api.autodesk.com/authentication/v2/token";

/// Read-only scopes requested for the hubs listing.
pub const DEFAULT_SCOPES: &[&str] = &["data:read", "bucket:read"];

/// Env vars read by `EnvSecretSource`
pub const CLIENT_ID_ENV: &str = "FORGE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "FORGE_CLIENT_SECRET";
