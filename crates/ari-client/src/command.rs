//! Call-control commands and the request shapes they carry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verb of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Percent-encode a value for use as a single path segment.
///
/// Everything but unreserved characters is encoded, so `PJSIP/2765`
/// becomes `PJSIP%2F2765`.
pub fn encode_path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// A single command against the call-control REST resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub method: Method,
    /// Resource path relative to the API root (e.g. `channels/123/moh`).
    pub resource: String,
    /// Query parameters.
    pub params: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl Command {
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::Get, resource)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(Method::Post, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::Delete, resource)
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Set the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Start music on hold for a channel.
    pub fn start_moh(channel_id: &str, moh_class: &str) -> Self {
        Self::post(format!("channels/{}/moh", channel_id)).param("mohClass", moh_class)
    }

    /// Stop music on hold for a channel.
    pub fn stop_moh(channel_id: &str) -> Self {
        Self::delete(format!("channels/{}/moh", channel_id))
    }

    /// Hang up a channel.
    pub fn hangup(channel_id: &str) -> Self {
        Self::delete(format!("channels/{}", channel_id))
    }

    /// Query the state of a device; the id is encoded exactly once.
    pub fn device_state(device_state_id: &str) -> Self {
        Self::get(format!("deviceStates/{}", encode_path_segment(device_state_id)))
    }

    /// Create a mixing bridge with the given id.
    pub fn create_bridge(bridge_id: &str) -> Self {
        Self::post("bridges")
            .param("type", "mixing")
            .param("bridgeId", bridge_id)
    }

    /// Add channels to an existing bridge.
    pub fn add_to_bridge(bridge_id: &str, channel_ids: &[&str]) -> Self {
        Self::post(format!("bridges/{}/addChannel", bridge_id)).param("channel", channel_ids.join(","))
    }

    /// Destroy a bridge.
    pub fn destroy_bridge(bridge_id: &str) -> Self {
        Self::delete(format!("bridges/{}", bridge_id))
    }

    /// Originate a new channel.
    pub fn originate(request: &OriginateRequest) -> Self {
        Self::post("channels")
            .param("app", request.app.as_str())
            .param("appArgs", request.app_args.as_str())
            .body(serde_json::json!({
                "endpoint": request.endpoint,
                "callerId": request.caller_id,
                "timeout": request.timeout_secs,
                "variables": request.variables,
            }))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.resource)
    }
}

/// Parameters for originating an outbound channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginateRequest {
    /// Dial endpoint (e.g. `PJSIP/2765`).
    pub endpoint: String,
    pub caller_id: String,
    /// Ring timeout in seconds.
    pub timeout_secs: u64,
    /// Application the channel enters once answered.
    pub app: String,
    /// Comma-separated arguments passed to the application.
    pub app_args: String,
    /// Channel variables.
    pub variables: BTreeMap<String, String>,
}

impl OriginateRequest {
    pub fn new(endpoint: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            caller_id: String::new(),
            timeout_secs: 30,
            app: app.into(),
            app_args: String::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = caller_id.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn app_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.app_args = args
            .into_iter()
            .map(|a| a.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Device state as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("PJSIP/2765"), "PJSIP%2F2765");
        assert_eq!(encode_path_segment("SIP/6000"), "SIP%2F6000");
        assert_eq!(encode_path_segment("Custom:agent a"), "Custom%3Aagent%20a");
    }

    #[test]
    fn test_device_state_encodes_once() {
        let cmd = Command::device_state("PJSIP/2765");
        assert_eq!(cmd.method, Method::Get);
        assert_eq!(cmd.resource, "deviceStates/PJSIP%2F2765");
        assert!(!cmd.resource.contains("%25"));
    }

    #[test]
    fn test_moh_commands() {
        let start = Command::start_moh("caller-1", "default");
        assert_eq!(start.to_string(), "POST channels/caller-1/moh");
        assert_eq!(start.param_value("mohClass"), Some("default"));

        let stop = Command::stop_moh("caller-1");
        assert_eq!(stop.to_string(), "DELETE channels/caller-1/moh");
        assert!(stop.params.is_empty());
    }

    #[test]
    fn test_originate_command() {
        let request = OriginateRequest::new("PJSIP/2765", "voice-agent")
            .caller_id("\"AI Agent\" <6789>")
            .timeout_secs(25)
            .app_args(["attended-transfer", "call-1", "support_agent"])
            .variable("AGENT_CALL_ID", "call-1");

        let cmd = Command::originate(&request);
        assert_eq!(cmd.to_string(), "POST channels");
        assert_eq!(cmd.param_value("app"), Some("voice-agent"));
        assert_eq!(
            cmd.param_value("appArgs"),
            Some("attended-transfer,call-1,support_agent")
        );

        let body = cmd.body.unwrap();
        assert_eq!(body["endpoint"], "PJSIP/2765");
        assert_eq!(body["callerId"], "\"AI Agent\" <6789>");
        assert_eq!(body["timeout"], 25);
        assert_eq!(body["variables"]["AGENT_CALL_ID"], "call-1");
    }

    #[test]
    fn test_bridge_commands() {
        let create = Command::create_bridge("b-1");
        assert_eq!(create.param_value("type"), Some("mixing"));
        assert_eq!(create.param_value("bridgeId"), Some("b-1"));

        let add = Command::add_to_bridge("b-1", &["caller-1", "agent-1"]);
        assert_eq!(add.resource, "bridges/b-1/addChannel");
        assert_eq!(add.param_value("channel"), Some("caller-1,agent-1"));

        let destroy = Command::destroy_bridge("b-1");
        assert_eq!(destroy.to_string(), "DELETE bridges/b-1");
    }
}
