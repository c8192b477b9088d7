//! App credentials and the secret sources that provide them
//!
//! The secret store holds the Forge app credentials as a single-key JSON
//! object: the key is the client id, the value is the client secret
//! (`{"<client id>": "<client secret>"}`). Anything else is rejected as
//! malformed.

use common::Secret;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::AuthFuture;
use crate::constants::{CLIENT_ID_ENV, CLIENT_SECRET_ENV};
use crate::error::{Error, Result};

/// Forge app client credentials. Never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
        }
    }
}

/// Source of the app credentials used for every token refresh.
pub trait SecretSource: Send + Sync {
    /// Identifier for logging (e.g. "secrets_manager", "env")
    fn id(&self) -> &str;

    /// Read the current client id/secret pair. Read-only.
    fn fetch_credentials(&self) -> AuthFuture<'_, Credentials>;
}

/// Parse a secret-store string payload into credentials.
///
/// `secret_name` is only used for error context.
pub fn parse_secret_string(secret_name: &str, payload: &str) -> Result<Credentials> {
    if payload.is_empty() {
        return Err(Error::SecretMalformed(format!(
            "secret {secret_name} has an empty string payload"
        )));
    }

    let object: Map<String, Value> = serde_json::from_str(payload).map_err(|e| {
        Error::SecretMalformed(format!("secret {secret_name} is not a JSON object: {e}"))
    })?;

    if object.len() != 1 {
        return Err(Error::SecretMalformed(format!(
            "secret {secret_name} must hold exactly one client id key, found {}",
            object.len()
        )));
    }

    let (client_id, value) = object
        .into_iter()
        .next()
        .ok_or_else(|| Error::SecretMalformed(format!("secret {secret_name} is empty")))?;

    match value {
        Value::String(client_secret) => Ok(Credentials::new(client_id, client_secret)),
        other => Err(Error::SecretMalformed(format!(
            "secret {secret_name} value for client id must be a string, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads credentials from `FORGE_CLIENT_ID` / `FORGE_CLIENT_SECRET`.
///
/// Local development backend; the variables are read on every fetch so a
/// rotated secret is picked up without a restart.
#[derive(Debug, Clone)]
pub struct EnvSecretSource {
    id_var: String,
    secret_var: String,
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::with_vars(CLIENT_ID_ENV, CLIENT_SECRET_ENV)
    }
}

impl EnvSecretSource {
    pub fn with_vars(id_var: impl Into<String>, secret_var: impl Into<String>) -> Self {
        Self {
            id_var: id_var.into(),
            secret_var: secret_var.into(),
        }
    }

    fn read(&self) -> Result<Credentials> {
        let client_id = read_var(&self.id_var)?;
        let client_secret = read_var(&self.secret_var)?;
        info!(source = "env", "retrieved app credentials");
        Ok(Credentials::new(client_id, client_secret))
    }
}

fn read_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            error!(var = name, "credential env var is not set");
            Err(Error::SecretNotFound(name.to_owned()))
        }
    }
}

impl SecretSource for EnvSecretSource {
    fn id(&self) -> &str {
        "env"
    }

    fn fetch_credentials(&self) -> AuthFuture<'_, Credentials> {
        let result = self.read();
        Box::pin(async move { result })
    }
}
