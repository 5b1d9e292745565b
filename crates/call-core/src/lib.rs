//! Core call state and configuration for the warm transfer agent.
//!
//! This crate provides the shared vocabulary used by the gateway, tool and
//! orchestrator crates:
//!
//! - [`CallSession`] / [`TransferAction`] - Per-call mutable state
//! - [`SessionStore`] - Versioned session storage with compare-and-swap
//! - [`TelephonyConfig`] - Typed configuration, validated once at load time
//!
//! # Example
//!
//! ```rust
//! use call_core::{CallSession, InMemorySessionStore, SessionStore};
//!
//! # async fn example() -> Result<(), call_core::SessionError> {
//! let store = InMemorySessionStore::new();
//! store.upsert(CallSession::new("call-1", "caller-chan-1")).await?;
//!
//! let session = store.get("call-1").await?.expect("session exists");
//! assert!(session.audio_capture_enabled);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod session;
mod store;

pub use config::{
    AiIdentity, AttendedTransferConfig, DestinationConfig, DestinationType, ExtensionConfig,
    ExtensionsConfig, TelephonyConfig, TransferConfig, CONFIG_PATH_ENV, DEFAULT_APP_NAME,
    DEFAULT_CONFIG_PATH, DEFAULT_DIAL_TIMEOUT_SECS, DEFAULT_MOH_CLASS, DEFAULT_TECHNOLOGY,
};
pub use error::{ConfigError, SessionError};
pub use session::{ActionType, CallSession, TransferAction, TransferDecision};
pub use store::{CasOutcome, InMemorySessionStore, SessionStore};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
