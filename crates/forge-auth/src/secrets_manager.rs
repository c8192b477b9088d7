//! AWS Secrets Manager backed secret source
//!
//! Reads the app credentials with `GetSecretValue`. The secret must be stored
//! as a string; binary secrets are rejected.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::config::http::HttpResponse;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::{GetSecretValueError, GetSecretValueOutput};
use tracing::{error, info, instrument};

use crate::AuthFuture;
use crate::credentials::{Credentials, SecretSource, parse_secret_string};
use crate::error::{Error, Result};

/// Secret source reading a named secret from AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct SecretsManagerSource {
    client: Client,
    secret_name: String,
}

impl SecretsManagerSource {
    pub fn new(client: Client, secret_name: impl Into<String>) -> Self {
        Self {
            client,
            secret_name: secret_name.into(),
        }
    }

    /// Build a client from the default AWS credential chain.
    ///
    /// `endpoint_url` overrides the regional endpoint (VPC endpoints,
    /// LocalStack).
    pub async fn connect(
        region: &str,
        endpoint_url: Option<&str>,
        secret_name: impl Into<String>,
    ) -> Self {
        info!(region, endpoint_url = ?endpoint_url, "creating Secrets Manager client");
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), secret_name)
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    #[instrument(skip_all, fields(secret_name = %self.secret_name))]
    async fn fetch(&self) -> Result<Credentials> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_name)
            .send()
            .await
            .map_err(|e| classify_error(&self.secret_name, e))?;

        let credentials = credentials_from_output(&self.secret_name, &output)?;
        info!("retrieved app credentials");
        Ok(credentials)
    }
}

/// Extract credentials from a `GetSecretValue` response.
///
/// Only a non-empty string payload is accepted.
fn credentials_from_output(secret_name: &str, output: &GetSecretValueOutput) -> Result<Credentials> {
    match (output.secret_string(), output.secret_binary()) {
        (Some(payload), _) if !payload.is_empty() => parse_secret_string(secret_name, payload),
        (_, Some(_)) => {
            error!(secret_name, "unexpected binary data in secret");
            Err(Error::SecretMalformed(format!(
                "secret {secret_name} holds binary data"
            )))
        }
        _ => Err(Error::SecretMalformed(format!(
            "secret {secret_name} has no payload"
        ))),
    }
}

/// Map a `GetSecretValue` failure onto the auth error kinds.
fn classify_error(secret_name: &str, err: SdkError<GetSecretValueError, HttpResponse>) -> Error {
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(e) if e.is_resource_not_found_exception() => {
            error!(secret_name, "requested secret was not found");
            Error::SecretNotFound(secret_name.to_owned())
        }
        Some(e) if e.is_invalid_request_exception() => {
            error!(secret_name, error = %detail, "secret request was invalid");
            Error::InvalidRequest(detail)
        }
        Some(e) if e.is_invalid_parameter_exception() => {
            error!(secret_name, error = %detail, "secret request had invalid parameters");
            Error::InvalidParameter(detail)
        }
        _ => {
            error!(secret_name, error = %detail, "secret store call failed");
            Error::SecretStore(detail)
        }
    }
}

impl SecretSource for SecretsManagerSource {
    fn id(&self) -> &str {
        "secrets_manager"
    }

    fn fetch_credentials(&self) -> AuthFuture<'_, Credentials> {
        Box::pin(self.fetch())
    }
}
