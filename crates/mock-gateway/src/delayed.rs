//! Delayed gateway - wraps another gateway with artificial latency.

use std::time::Duration;

use ari_client::{CallControl, Command, GatewayError};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;

/// A gateway that sleeps before forwarding each command.
///
/// Useful for widening race windows between concurrent transfer triggers.
pub struct DelayedGateway<G: CallControl> {
    inner: G,
    delay: Duration,
}

impl<G: CallControl> DelayedGateway<G> {
    pub fn new(inner: G, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn with_millis(inner: G, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// The wrapped gateway.
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: CallControl> CallControl for DelayedGateway<G> {
    async fn send_command(&self, command: Command) -> Result<Value, GatewayError> {
        sleep(self.delay).await;
        self.inner.send_command(command).await
    }
}
