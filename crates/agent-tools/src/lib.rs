//! Tool registry and telephony tools for the voice agent.
//!
//! This crate provides a `ToolRegistry` for registering and executing tools
//! the conversation layer can invoke during a call. Every tool returns a
//! uniform [`ToolOutput`] (`success`, `failed` or `error` plus
//! operation-specific fields); [`ToolRegistry::dispatch`] folds errors into
//! that shape so the caller never sees an `Err`.
//!
//! # Built-in Tools
//!
//! - [`CheckExtensionStatus`] - Query whether an internal extension is
//!   available via its device state.
//!
//! The attended transfer tool lives with the transfer orchestrator, which
//! owns the session state it acts on.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_tools::{telephony_registry, ToolArgs};
//!
//! let registry = telephony_registry(gateway, config);
//! let output = registry
//!     .dispatch("check_extension_status", ToolArgs::default().param("extension", "2765"))
//!     .await;
//! println!("{}", output.to_json());
//! ```

pub mod device_state;
mod error;
mod registry;
mod tool;
pub mod tools;

use std::sync::Arc;

use ari_client::CallControl;
use call_core::TelephonyConfig;

pub use device_state::{
    check_availability, normalize_state, resolve_device_state_id, DeviceStateResolution,
    ResolutionSource,
};
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::{
    CallContext, Tool, ToolArgs, ToolOutput, ToolParameter, ToolStatus,
    DEFAULT_MAX_EXECUTION_TIME,
};
pub use tools::{CheckExtensionStatus, DeviceStateResult};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Create a registry with the telephony tools that need no call session.
pub fn telephony_registry(
    gateway: Arc<dyn CallControl>,
    config: Arc<TelephonyConfig>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CheckExtensionStatus::new(gateway, config));
    registry
}
