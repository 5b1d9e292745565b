//! The call-control gateway seam.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::command::{Command, DeviceState, OriginateRequest};
use crate::error::GatewayError;

/// Issues commands against an external call-control platform.
///
/// Implementors only provide [`send_command`](CallControl::send_command);
/// the typed helpers are built on top of it so test doubles observe every
/// command exactly as it would go over the wire.
#[async_trait]
pub trait CallControl: Send + Sync {
    /// Send a raw command and return the decoded JSON response
    /// (`Value::Null` for empty bodies).
    async fn send_command(&self, command: Command) -> Result<Value, GatewayError>;

    /// Start music on hold on a channel.
    async fn start_moh(&self, channel_id: &str, moh_class: &str) -> Result<(), GatewayError> {
        self.send_command(Command::start_moh(channel_id, moh_class))
            .await
            .map(|_| ())
    }

    /// Stop music on hold on a channel.
    async fn stop_moh(&self, channel_id: &str) -> Result<(), GatewayError> {
        self.send_command(Command::stop_moh(channel_id)).await.map(|_| ())
    }

    /// Originate a channel and return its id.
    async fn originate(&self, request: &OriginateRequest) -> Result<String, GatewayError> {
        let response = self.send_command(Command::originate(request)).await?;
        response
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(GatewayError::MissingField("id"))
    }

    /// Hang up a channel.
    async fn hangup(&self, channel_id: &str) -> Result<(), GatewayError> {
        self.send_command(Command::hangup(channel_id)).await.map(|_| ())
    }

    /// Join two channels in a new mixing bridge and return the bridge id.
    async fn bridge(&self, first: &str, second: &str) -> Result<String, GatewayError> {
        let requested = uuid::Uuid::new_v4().to_string();
        let response = self.send_command(Command::create_bridge(&requested)).await?;
        let bridge_id = response
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(requested);

        debug!("Adding {} and {} to bridge {}", first, second, bridge_id);
        if let Err(e) = self
            .send_command(Command::add_to_bridge(&bridge_id, &[first, second]))
            .await
        {
            if let Err(destroy) = self.send_command(Command::destroy_bridge(&bridge_id)).await {
                warn!("Failed to destroy bridge {}: {}", bridge_id, destroy);
            }
            return Err(e);
        }
        Ok(bridge_id)
    }

    /// Query the state of a device by its device state name.
    async fn device_state(&self, device_state_id: &str) -> Result<DeviceState, GatewayError> {
        let response = self.send_command(Command::device_state(device_state_id)).await?;
        if response.is_null() {
            return Ok(DeviceState::default());
        }
        Ok(serde_json::from_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every command with a fixed response and records it.
    struct FixedGateway {
        response: Value,
        failing_suffix: Option<&'static str>,
        seen: Mutex<Vec<Command>>,
    }

    impl FixedGateway {
        fn new(response: Value) -> Self {
            Self {
                response,
                failing_suffix: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, suffix: &'static str) -> Self {
            self.failing_suffix = Some(suffix);
            self
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|c| c.to_string()).collect()
        }
    }

    #[async_trait]
    impl CallControl for FixedGateway {
        async fn send_command(&self, command: Command) -> Result<Value, GatewayError> {
            let fails = self
                .failing_suffix
                .map_or(false, |suffix| command.resource.ends_with(suffix));
            self.seen.lock().unwrap().push(command);
            if fails {
                return Err(GatewayError::Connection("refused".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_originate_returns_id() {
        let gateway = FixedGateway::new(json!({ "id": "agent-1" }));
        let id = gateway
            .originate(&OriginateRequest::new("PJSIP/2765", "app"))
            .await
            .unwrap();
        assert_eq!(id, "agent-1");
    }

    #[tokio::test]
    async fn test_originate_without_id_fails() {
        for response in [json!({}), json!({ "id": "" }), Value::Null] {
            let gateway = FixedGateway::new(response);
            let result = gateway
                .originate(&OriginateRequest::new("PJSIP/2765", "app"))
                .await;
            assert!(matches!(result, Err(GatewayError::MissingField("id"))));
        }
    }

    #[tokio::test]
    async fn test_bridge_uses_returned_id() {
        let gateway = FixedGateway::new(json!({ "id": "bridge-9" }));
        let id = gateway.bridge("caller-1", "agent-1").await.unwrap();
        assert_eq!(id, "bridge-9");
        assert_eq!(
            gateway.seen(),
            vec!["POST bridges", "POST bridges/bridge-9/addChannel"]
        );
    }

    #[tokio::test]
    async fn test_failed_join_destroys_bridge() {
        let gateway = FixedGateway::new(json!({ "id": "bridge-9" })).failing_on("/addChannel");
        let result = gateway.bridge("caller-1", "agent-1").await;
        assert!(matches!(result, Err(GatewayError::Connection(_))));
        assert_eq!(
            gateway.seen(),
            vec![
                "POST bridges",
                "POST bridges/bridge-9/addChannel",
                "DELETE bridges/bridge-9"
            ]
        );
    }

    #[tokio::test]
    async fn test_device_state_parses_response() {
        let gateway = FixedGateway::new(json!({ "name": "SIP/6000", "state": "NOT_INUSE" }));
        let state = gateway.device_state("SIP/6000").await.unwrap();
        assert_eq!(state.name, "SIP/6000");
        assert_eq!(state.state, "NOT_INUSE");
        assert_eq!(gateway.seen(), vec!["GET deviceStates/SIP%2F6000"]);
    }
}
