//! Error types for tool operations.

use std::time::Duration;

use ari_client::GatewayError;
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Missing required parameter.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The tool needs an active call but none was supplied.
    #[error("Tool '{0}' requires an active call")]
    MissingCallContext(String),

    /// Call-control request failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The tool did not finish within its execution budget.
    #[error("Tool '{tool}' timed out after {after:?}")]
    TimedOut { tool: String, after: Duration },

    /// General execution error.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
