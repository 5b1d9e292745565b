//! Routing of agent-leg events back to the call they belong to.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::TriggerError;

/// Maps agent channels to the call whose transfer they serve.
///
/// Platform events for an agent leg only carry the channel id; the router
/// lets the orchestrator find the call session for them.
#[async_trait]
pub trait DtmfRouter: Send + Sync {
    /// Route events from `agent_channel_id` to `call_id`.
    async fn register(&self, agent_channel_id: &str, call_id: &str) -> Result<(), TriggerError>;

    /// Stop routing events from `agent_channel_id`.
    async fn unregister(&self, agent_channel_id: &str);

    /// The call an agent channel is routed to.
    async fn lookup(&self, agent_channel_id: &str) -> Option<String>;
}

/// Thread-safe in-memory router.
#[derive(Debug, Default)]
pub struct InMemoryDtmfRouter {
    routes: RwLock<HashMap<String, String>>,
}

impl InMemoryDtmfRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered channels.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }
}

#[async_trait]
impl DtmfRouter for InMemoryDtmfRouter {
    async fn register(&self, agent_channel_id: &str, call_id: &str) -> Result<(), TriggerError> {
        let mut routes = self.routes.write().await;
        if let Some(existing) = routes.get(agent_channel_id) {
            if existing != call_id {
                return Err(TriggerError::AlreadyRegistered {
                    channel_id: agent_channel_id.to_string(),
                    call_id: existing.clone(),
                });
            }
        }

        debug!("Routing DTMF from {} to call {}", agent_channel_id, call_id);
        routes.insert(agent_channel_id.to_string(), call_id.to_string());
        Ok(())
    }

    async fn unregister(&self, agent_channel_id: &str) {
        if self.routes.write().await.remove(agent_channel_id).is_some() {
            debug!("Unrouted DTMF from {}", agent_channel_id);
        }
    }

    async fn lookup(&self, agent_channel_id: &str) -> Option<String> {
        self.routes.read().await.get(agent_channel_id).cloned()
    }
}
