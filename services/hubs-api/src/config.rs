//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Only `[server]` is mandatory; every Forge/AWS setting has a default.
//! App credentials are never part of the TOML: they live in the secret store.

use forge_auth::{DEFAULT_SCOPES, HUBS_ENDPOINT, TOKEN_ENDPOINT};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use token_store::DEFAULT_TABLE_NAME;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub forge: ForgeConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub token_store: TokenStoreConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub status_codes: StatusCodeMode,
}

/// How `/hubs` outcomes map to HTTP status codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCodeMode {
    /// 200 for every outcome; the body tells them apart
    #[default]
    Legacy,
    /// 200 hubs, 401 missing token / unauthorized, 502 failed
    Explicit,
}

/// Forge API endpoints
#[derive(Debug, Deserialize)]
pub struct ForgeConfig {
    #[serde(default = "default_hubs_url")]
    pub hubs_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            hubs_url: default_hubs_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretsBackend {
    #[default]
    SecretsManager,
    Env,
}

/// Where the app client id/secret come from
#[derive(Debug, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub backend: SecretsBackend,
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretsBackend::default(),
            secret_name: None,
            region: default_region(),
            endpoint_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Dynamodb,
    File,
    Memory,
}

/// Where the active access token is persisted
#[derive(Debug, Deserialize)]
pub struct TokenStoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Token file for the `file` backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table_name: default_table_name(),
            region: default_region(),
            endpoint_url: None,
            path: None,
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_hubs_url() -> String {
    HUBS_ENDPOINT.to_string()
}

fn default_token_url() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_timeout() -> u64 {
    30
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn require_http_url(field: &str, url: &str) -> common::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Overlays:
    /// - FORGE_SECRET_NAME replaces `secrets.secret_name`
    /// - FORGE_TOKEN_TABLE replaces `token_store.table_name`
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(name) = std::env::var("FORGE_SECRET_NAME") {
            config.secrets.secret_name = Some(name);
        }
        if let Ok(table) = std::env::var("FORGE_TOKEN_TABLE") {
            config.token_store.table_name = table;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        require_http_url("forge.hubs_url", &self.forge.hubs_url)?;
        require_http_url("forge.token_url", &self.forge.token_url)?;

        if self.forge.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.forge.scopes.is_empty() {
            return Err(common::Error::Config(
                "forge.scopes must list at least one scope".into(),
            ));
        }

        if self.secrets.backend == SecretsBackend::SecretsManager
            && self
                .secrets
                .secret_name
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(common::Error::Config(
                "secrets.secret_name is required for the secrets_manager backend".into(),
            ));
        }
        if let Some(url) = &self.secrets.endpoint_url {
            require_http_url("secrets.endpoint_url", url)?;
        }

        match self.token_store.backend {
            StoreBackend::Dynamodb if self.token_store.table_name.is_empty() => {
                return Err(common::Error::Config(
                    "token_store.table_name must not be empty".into(),
                ));
            }
            StoreBackend::File if self.token_store.path.is_none() => {
                return Err(common::Error::Config(
                    "token_store.path is required for the file backend".into(),
                ));
            }
            _ => {}
        }
        if let Some(url) = &self.token_store.endpoint_url {
            require_http_url("token_store.endpoint_url", url)?;
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("forge-hubs.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that read or mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    /// Clear all overlays. Caller holds ENV_MUTEX.
    fn clear_overlays() {
        unsafe { remove_env("FORGE_SECRET_NAME") };
        unsafe { remove_env("FORGE_TOKEN_TABLE") };
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8080"

[secrets]
secret_name = "forge-hubs/app"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("forge-hubs.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.status_codes, StatusCodeMode::Legacy);
        assert_eq!(
            config.forge.hubs_url,
            "https://developer.api.autodesk.com/project/v1/hubs"
        );
        assert_eq!(config.forge.scopes, vec!["data:read", "bucket:read"]);
        assert_eq!(config.forge.timeout_secs, 30);
        assert_eq!(config.secrets.backend, SecretsBackend::SecretsManager);
        assert_eq!(config.secrets.secret_name.as_deref(), Some("forge-hubs/app"));
        assert_eq!(config.secrets.region, "us-east-1");
        assert_eq!(config.token_store.backend, StoreBackend::Dynamodb);
        assert_eq!(config.token_store.table_name, "ForgeAuthSession");
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "0.0.0.0:9000"
max_connections = 50
status_codes = "explicit"

[forge]
hubs_url = "http://localhost:3000/project/v1/hubs"
token_url = "http://localhost:3000/authentication/v2/token"
scopes = ["data:read"]
timeout_secs = 5

[secrets]
backend = "env"
region = "eu-west-1"

[token_store]
backend = "file"
path = "/tmp/forge-tokens.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.max_connections, 50);
        assert_eq!(config.server.status_codes, StatusCodeMode::Explicit);
        assert_eq!(config.forge.scopes, vec!["data:read"]);
        assert_eq!(config.forge.timeout_secs, 5);
        assert_eq!(config.secrets.backend, SecretsBackend::Env);
        assert!(config.secrets.secret_name.is_none());
        assert_eq!(config.token_store.backend, StoreBackend::File);
        assert_eq!(
            config.token_store.path.as_deref(),
            Some(Path::new("/tmp/forge-tokens.json"))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/forge-hubs.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_unknown_status_code_mode_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"
status_codes = "sometimes"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_secret_name_required_for_secrets_manager() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("secrets.secret_name is required"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_secret_name_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"
"#,
        );

        unsafe { set_env("FORGE_SECRET_NAME", "from-env") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.secrets.secret_name.as_deref(), Some("from-env"));
        clear_overlays();
    }

    #[test]
    fn test_env_overrides_file_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("FORGE_SECRET_NAME", "env-wins") };
        unsafe { set_env("FORGE_TOKEN_TABLE", "ForgeAuthSessionStaging") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.secrets.secret_name.as_deref(), Some("env-wins"));
        assert_eq!(config.token_store.table_name, "ForgeAuthSessionStaging");
        clear_overlays();
    }

    #[test]
    fn test_file_backend_requires_path() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[secrets]
backend = "env"

[token_store]
backend = "file"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("token_store.path"), "got: {err}");
    }

    #[test]
    fn test_invalid_hubs_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[forge]
hubs_url = "developer.api.autodesk.com/project/v1/hubs"

[secrets]
secret_name = "forge-hubs/app"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("forge.hubs_url must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn test_invalid_endpoint_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[secrets]
secret_name = "forge-hubs/app"

[token_store]
endpoint_url = "localhost:8000"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[forge]
timeout_secs = 0

[secrets]
secret_name = "forge-hubs/app"
"#,
        );

        assert!(Config::load(&path).is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"
max_connections = 0

[secrets]
secret_name = "forge-hubs/app"
"#,
        );

        assert!(
            Config::load(&path).is_err(),
            "max_connections = 0 must be rejected"
        );
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlays();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[forge]
scopes = []

[secrets]
secret_name = "forge-hubs/app"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("forge-hubs.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
