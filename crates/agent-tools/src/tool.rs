//! Tool trait definition and types.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Default execution budget for a tool.
pub const DEFAULT_MAX_EXECUTION_TIME: Duration = Duration::from_secs(10);

/// The call a tool is executing on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub call_id: String,
    /// Channel of the caller's leg.
    pub caller_channel_id: String,
}

impl CallContext {
    pub fn new(call_id: impl Into<String>, caller_channel_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            caller_channel_id: caller_channel_id.into(),
        }
    }
}

/// Arguments passed to a tool for execution.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    /// Parameters as key-value pairs.
    pub params: HashMap<String, Value>,
    /// The active call, for tools that act on one.
    pub call: Option<CallContext>,
}

impl ToolArgs {
    /// Create new tool arguments with the given parameters.
    pub fn new(params: HashMap<String, Value>) -> Self {
        Self { params, call: None }
    }

    /// Create tool arguments bound to an active call.
    pub fn with_call(params: HashMap<String, Value>, call: CallContext) -> Self {
        Self {
            params,
            call: Some(call),
        }
    }

    /// Add a string parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Get a string parameter, returning an error if missing or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ToolError::InvalidParameter {
                name: key.to_string(),
                reason: "expected string".to_string(),
            })
    }

    /// Get an optional string parameter.
    pub fn get_string_opt(&self, key: &str) -> Option<String> {
        self.params.get(key)?.as_str().map(|s| s.to_string())
    }

    /// Get a trimmed string parameter, treating blank values as absent.
    pub fn get_trimmed(&self, key: &str) -> Option<String> {
        self.get_string_opt(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// First non-blank string among several parameter aliases.
    pub fn get_first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get_trimmed(key))
    }

    /// The active call, or an error naming the tool that needed it.
    pub fn require_call(&self, tool: &str) -> Result<&CallContext, ToolError> {
        self.call
            .as_ref()
            .ok_or_else(|| ToolError::MissingCallContext(tool.to_string()))
    }
}

/// Outcome category of a tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// The operation did what was asked.
    Success,
    /// The operation was refused or could not be carried out.
    Failed,
    /// The operation hit an unexpected error.
    Error,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolStatus::Success => "success",
            ToolStatus::Failed => "failed",
            ToolStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Output from a tool execution.
///
/// Serializes flat: `{"status": "...", "message": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Operation-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ToolOutput {
    fn with_status(status: ToolStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Create a successful output.
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(ToolStatus::Success, message)
    }

    /// Create a failed output.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(ToolStatus::Failed, message)
    }

    /// Create an error output.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(ToolStatus::Error, message)
    }

    /// Attach an operation-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Look up an operation-specific field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Declared parameter of a tool, used for help text and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolParameter {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl ToolParameter {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

/// Trait for tools the voice agent can invoke during a call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for dispatch).
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Declared parameters. Required string parameters are checked by the
    /// registry before `execute` runs.
    fn parameters(&self) -> Vec<ToolParameter> {
        Vec::new()
    }

    /// Whether the tool can only run with an active call.
    fn requires_call(&self) -> bool {
        false
    }

    /// Budget after which the registry abandons the execution.
    fn max_execution_time(&self) -> Duration {
        DEFAULT_MAX_EXECUTION_TIME
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;
}
