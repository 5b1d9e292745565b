//! Recording gateway - logs every command and answers from a script.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use ari_client::{CallControl, Command, GatewayError, Method};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// A gateway that records commands instead of executing them.
///
/// Responses:
/// - `POST channels` returns `{"id": "agent-N"}` with N counting up from 1,
///   unless an originate response was scripted
/// - `POST bridges` echoes the requested `bridgeId`
/// - `GET deviceStates/{id}` returns the scripted state for the decoded id,
///   or `UNKNOWN`
/// - everything else returns `null`
///
/// Commands matching a configured failure are still recorded, then fail.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    commands: Mutex<Vec<Command>>,
    originate_response: Option<Value>,
    device_states: HashMap<String, String>,
    failures: Vec<(Method, String)>,
    originated: AtomicU64,
}

impl RecordingGateway {
    /// Create a gateway where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer originations with a fixed channel id.
    pub fn with_originate_id(self, channel_id: impl Into<String>) -> Self {
        self.with_originate_response(json!({ "id": channel_id.into() }))
    }

    /// Answer originations with an arbitrary response body.
    pub fn with_originate_response(mut self, response: Value) -> Self {
        self.originate_response = Some(response);
        self
    }

    /// Script the state reported for a device.
    pub fn with_device_state(mut self, device_state_id: impl Into<String>, state: impl Into<String>) -> Self {
        self.device_states.insert(device_state_id.into(), state.into());
        self
    }

    /// Fail commands with this method whose resource starts with `resource_prefix`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_gateway::{Method, RecordingGateway};
    ///
    /// // Every origination fails with a transport error.
    /// let gateway = RecordingGateway::new().fail_on(Method::Post, "channels");
    /// ```
    pub fn fail_on(mut self, method: Method, resource_prefix: impl Into<String>) -> Self {
        self.failures.push((method, resource_prefix.into()));
        self
    }

    /// All recorded commands in order.
    pub fn commands(&self) -> Vec<Command> {
        self.lock().clone()
    }

    /// Recorded commands rendered as `METHOD resource`.
    pub fn log(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.to_string()).collect()
    }

    /// Number of recorded commands with this method and exact resource.
    pub fn count(&self, method: Method, resource: &str) -> usize {
        self.lock()
            .iter()
            .filter(|c| c.method == method && c.resource == resource)
            .count()
    }

    /// Forget recorded commands.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        self.commands.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn should_fail(&self, command: &Command) -> bool {
        self.failures.iter().any(|(method, prefix)| {
            *method == command.method && command.resource.starts_with(prefix.as_str())
        })
    }

    fn respond(&self, command: &Command) -> Value {
        match (command.method, command.resource.as_str()) {
            (Method::Post, "channels") => match &self.originate_response {
                Some(response) => response.clone(),
                None => {
                    let n = self.originated.fetch_add(1, Ordering::SeqCst) + 1;
                    json!({ "id": format!("agent-{}", n) })
                }
            },
            (Method::Post, "bridges") => {
                json!({ "id": command.param_value("bridgeId").unwrap_or("bridge-1") })
            }
            (Method::Get, resource) if resource.starts_with("deviceStates/") => {
                let encoded = &resource["deviceStates/".len()..];
                let id = urlencoding::decode(encoded)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| encoded.to_string());
                let state = self
                    .device_states
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| "UNKNOWN".to_string());
                json!({ "name": id, "state": state })
            }
            _ => Value::Null,
        }
    }
}

#[async_trait]
impl CallControl for RecordingGateway {
    async fn send_command(&self, command: Command) -> Result<Value, GatewayError> {
        debug!("RecordingGateway: {}", command);
        let fail = self.should_fail(&command);
        let response = self.respond(&command);
        let rendered = command.to_string();
        self.lock().push(command);

        if fail {
            return Err(GatewayError::Connection(format!("injected failure: {}", rendered)));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ari_client::OriginateRequest;

    #[tokio::test]
    async fn test_sequential_originate_ids() {
        let gateway = RecordingGateway::new();
        let request = OriginateRequest::new("PJSIP/2765", "app");
        assert_eq!(gateway.originate(&request).await.unwrap(), "agent-1");
        assert_eq!(gateway.originate(&request).await.unwrap(), "agent-2");
        assert_eq!(gateway.count(Method::Post, "channels"), 2);
    }

    #[tokio::test]
    async fn test_scripted_originate_without_id() {
        let gateway = RecordingGateway::new().with_originate_response(json!({}));
        let result = gateway.originate(&OriginateRequest::new("PJSIP/2765", "app")).await;
        assert!(matches!(result, Err(GatewayError::MissingField("id"))));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let gateway = RecordingGateway::new().fail_on(Method::Post, "channels/caller-1/moh");

        assert!(gateway.start_moh("caller-1", "default").await.is_err());
        assert!(gateway.start_moh("caller-2", "default").await.is_ok());
        assert_eq!(
            gateway.log(),
            vec!["POST channels/caller-1/moh", "POST channels/caller-2/moh"]
        );
    }

    #[tokio::test]
    async fn test_device_state_lookup_decodes_id() {
        let gateway = RecordingGateway::new().with_device_state("PJSIP/2765", "INUSE");
        assert_eq!(gateway.device_state("PJSIP/2765").await.unwrap().state, "INUSE");
        assert_eq!(gateway.device_state("SIP/1").await.unwrap().state, "UNKNOWN");
    }

    #[tokio::test]
    async fn test_clear() {
        let gateway = RecordingGateway::new();
        gateway.hangup("agent-1").await.unwrap();
        assert_eq!(gateway.commands().len(), 1);
        gateway.clear();
        assert!(gateway.log().is_empty());
    }
}
