//! Asterisk REST Interface HTTP client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::AriConfig;
use crate::error::GatewayError;
use crate::gateway::CallControl;

/// Client for the call-control REST interface.
#[derive(Clone)]
pub struct AriClient {
    http: Client,
    config: AriConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl AriClient {
    /// Build a client without contacting the platform.
    pub fn new(config: AriConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build a client and verify the platform is reachable.
    pub async fn connect(config: AriConfig) -> Result<Self, GatewayError> {
        let client = Self::new(config)?;

        if client.health_check().await? {
            info!("Connected to ARI at {}", client.config.base_url);
        } else {
            return Err(GatewayError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if the last health check succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the platform.
    pub async fn health_check(&self) -> Result<bool, GatewayError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.authorized(self.http.get(&url)).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(GatewayError::Http(e))
            }
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AriConfig {
        &self.config
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl CallControl for AriClient {
    async fn send_command(&self, command: Command) -> Result<Value, GatewayError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.resource_url(&command.resource);

        debug!("ARI request #{}: {}", id, command);

        let mut request = self
            .authorized(self.http.request(command.method.into(), &url))
            .query(&command.params);
        if let Some(ref body) = command.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            GatewayError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("ARI request #{} failed: HTTP {}", id, status);
            return Err(GatewayError::Status {
                method: command.method.to_string(),
                resource: command.resource,
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl std::fmt::Debug for AriClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AriClient")
            .field("base_url", &self.config.base_url)
            .field("connected", &self.is_connected())
            .finish()
    }
}
