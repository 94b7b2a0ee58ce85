//! Configuration for the REST client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::retry::RetryPolicy;

/// REST client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address of the REST API.
    pub address: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Request timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub backoff_base_ms: u64,
    /// Upper bound for a single retry delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Client certificate (PEM).
    pub sslcert: Option<PathBuf>,
    /// Private key for `sslcert` (PKCS#8 PEM).
    pub sslkey: Option<PathBuf>,
    /// CA bundle replacing the built-in roots.
    pub cacert: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            token: None,
            timeout_ms: 60_000,
            retries: 10,
            backoff_base_ms: 300,
            max_backoff_ms: 30_000,
            username: None,
            password: None,
            sslcert: None,
            sslkey: None,
            cacert: None,
        }
    }
}

impl ClientConfig {
    /// Create a default configuration for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn from_file(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ClientError::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| ClientError::config(format!("invalid TOML: {e}"))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| ClientError::config(format!("invalid JSON: {e}"))),
            _ => Err(ClientError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Variables are prefixed with `REST_TOOLS_`. Numeric values that fail
    /// to parse are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Like [`with_env_overrides`](Self::with_env_overrides), reading
    /// variables through `lookup`.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup("REST_TOOLS_ADDRESS") {
            self.address = address;
        }

        if let Some(token) = lookup("REST_TOOLS_TOKEN") {
            self.token = Some(token);
        }

        // seconds, fractions allowed
        if let Some(timeout) = lookup("REST_TOOLS_TIMEOUT")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        {
            self.timeout_ms = millis(timeout);
        }

        if let Some(retries) = lookup("REST_TOOLS_RETRIES").and_then(|v| v.parse().ok()) {
            self.retries = retries;
        }

        if let Some(username) = lookup("REST_TOOLS_USERNAME") {
            self.username = Some(username);
        }

        if let Some(password) = lookup("REST_TOOLS_PASSWORD") {
            self.password = Some(password);
        }

        if let Some(path) = lookup("REST_TOOLS_SSLCERT") {
            self.sslcert = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("REST_TOOLS_SSLKEY") {
            self.sslkey = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("REST_TOOLS_CACERT") {
            self.cacert = Some(PathBuf::from(path));
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        if self.address.is_empty() {
            return Err(ClientError::config("address is required"));
        }

        if !self.address.starts_with("http://") && !self.address.starts_with("https://") {
            return Err(ClientError::config(
                "address must start with http:// or https://",
            ));
        }

        if self.timeout_ms == 0 {
            return Err(ClientError::config("timeout must be at least 1ms"));
        }

        if self.sslkey.is_some() && self.sslcert.is_none() {
            return Err(ClientError::config("sslkey requires sslcert"));
        }

        if self.username.is_some() != self.password.is_some() {
            return Err(ClientError::config(
                "username and password must be given together",
            ));
        }

        Ok(())
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry policy derived from the retry settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
            .with_base_delay(Duration::from_millis(self.backoff_base_ms))
            .with_max_delay(Duration::from_millis(self.max_backoff_ms))
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = millis(timeout);
        self
    }

    /// Set the number of retries.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the base and maximum retry delays.
    #[must_use]
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.backoff_base_ms = millis(base);
        self.config.max_backoff_ms = millis(max);
        self
    }

    /// Enable basic auth.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Set the client certificate and optional separate key.
    #[must_use]
    pub fn client_cert(mut self, cert: impl Into<PathBuf>, key: Option<PathBuf>) -> Self {
        self.config.sslcert = Some(cert.into());
        self.config.sslkey = key;
        self
    }

    /// Set the CA bundle.
    #[must_use]
    pub fn cacert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cacert = Some(path.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
