//! Cancellable no-answer guards for agent legs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TriggerError;
use crate::events::TransferEvent;

/// Schedules a timeout event for an agent leg.
#[async_trait]
pub trait TimeoutScheduler: Send + Sync {
    /// Fire a timeout for (`call_id`, `agent_channel_id`) after `after`.
    ///
    /// Scheduling again for the same pair replaces the earlier guard.
    async fn schedule(
        &self,
        call_id: &str,
        agent_channel_id: &str,
        after: Duration,
    ) -> Result<(), TriggerError>;

    /// Cancel the guard for (`call_id`, `agent_channel_id`), if any.
    async fn cancel(&self, call_id: &str, agent_channel_id: &str);
}

type GuardKey = (String, String);

/// Scheduler backed by spawned tokio tasks.
///
/// An expired guard sends [`TransferEvent::Timeout`] on the event channel
/// the orchestrator consumes.
pub struct TokioTimeoutScheduler {
    events: mpsc::UnboundedSender<TransferEvent>,
    guards: Arc<Mutex<HashMap<GuardKey, JoinHandle<()>>>>,
}

impl TokioTimeoutScheduler {
    pub fn new(events: mpsc::UnboundedSender<TransferEvent>) -> Self {
        Self {
            events,
            guards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of guards that have neither fired nor been cancelled.
    pub async fn pending(&self) -> usize {
        self.guards.lock().await.len()
    }
}

#[async_trait]
impl TimeoutScheduler for TokioTimeoutScheduler {
    async fn schedule(
        &self,
        call_id: &str,
        agent_channel_id: &str,
        after: Duration,
    ) -> Result<(), TriggerError> {
        if self.events.is_closed() {
            return Err(TriggerError::Unavailable(
                "timeout event channel is closed".to_string(),
            ));
        }

        let key = (call_id.to_string(), agent_channel_id.to_string());
        let events = self.events.clone();
        let guards = self.guards.clone();
        let task_key = key.clone();

        let mut map = self.guards.lock().await;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            guards.lock().await.remove(&task_key);

            let (call_id, channel_id) = task_key;
            debug!("Transfer timeout fired for {} on {}", call_id, channel_id);
            if events
                .send(TransferEvent::Timeout {
                    call_id,
                    channel_id,
                })
                .is_err()
            {
                warn!("Timeout fired but the event channel is closed");
            }
        });

        if let Some(previous) = map.insert(key, handle) {
            previous.abort();
        }
        debug!(
            "Scheduled transfer timeout for {} on {} in {:?}",
            call_id, agent_channel_id, after
        );
        Ok(())
    }

    async fn cancel(&self, call_id: &str, agent_channel_id: &str) {
        let key = (call_id.to_string(), agent_channel_id.to_string());
        if let Some(handle) = self.guards.lock().await.remove(&key) {
            handle.abort();
            debug!("Cancelled transfer timeout for {} on {}", call_id, agent_channel_id);
        }
    }
}
