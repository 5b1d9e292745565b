//! Configuration types for the ARI client.

use std::env;
use std::time::Duration;

use crate::error::GatewayError;

/// Configuration for connecting to the Asterisk REST Interface.
#[derive(Debug, Clone)]
pub struct AriConfig {
    /// Base URL of the REST interface (e.g., "http://127.0.0.1:8088/ari").
    pub base_url: String,
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AriConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Create configuration with basic auth credentials.
    pub fn with_credentials(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::new(base_url)
        }
    }

    /// Load configuration from `ARI_URL`, `ARI_USERNAME`, `ARI_PASSWORD`
    /// and `ARI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, GatewayError> {
        let base_url =
            env::var("ARI_URL").unwrap_or_else(|_| "http://127.0.0.1:8088/ari".to_string());
        let mut config = Self::new(base_url);

        config.username = env::var("ARI_USERNAME").ok();
        config.password = env::var("ARI_PASSWORD").ok();
        if config.username.is_some() != config.password.is_some() {
            return Err(GatewayError::Config(
                "ARI_USERNAME and ARI_PASSWORD must be set together".to_string(),
            ));
        }

        if let Ok(value) = env::var("ARI_TIMEOUT_SECS") {
            let secs: u64 = value
                .parse()
                .map_err(|_| GatewayError::Config(format!("invalid ARI_TIMEOUT_SECS: {}", value)))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Full URL for a resource path (e.g. `channels/123/moh`).
    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_start_matches('/'))
    }

    /// Get the health check endpoint URL.
    pub fn check_url(&self) -> String {
        self.resource_url("asterisk/info")
    }
}

impl Default for AriConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8088/ari")
    }
}
