//! Attended (warm) transfer orchestration for the voice agent.
//!
//! This crate provides the [`TransferOrchestrator`], which moves a caller to
//! a human agent without dropping them: the caller hears hold music while
//! the agent leg rings, and the agent decides with a keypress.
//!
//! # Flow
//!
//! ```text
//! attended_transfer tool call
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TRANSFER ORCHESTRATOR                      │
//! │                                                             │
//! │  1. Check preconditions, resolve dial endpoint              │
//! │         ↓                                                   │
//! │  2. Claim the session (CAS), pause audio capture            │
//! │         ↓                                                   │
//! │  3. Start hold music on the caller                          │
//! │         ↓                                                   │
//! │  4. Originate the agent leg                                 │
//! │         ↓                                                   │
//! │  5. Register DTMF route, schedule timeout guard             │
//! │         ↓                                                   │
//! │  6. Return "Please hold..."                                 │
//! └─────────────────────────────────────────────────────────────┘
//!          ↓ (later, first trigger wins)
//!   DTMF 1 → bridge  │  DTMF 2 / hangup → release  │  timeout → release
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{InMemoryDtmfRouter, TokioTimeoutScheduler, TransferOrchestrator};
//! use tokio::sync::mpsc;
//!
//! let (events_tx, events_rx) = mpsc::unbounded_channel();
//! let orchestrator = Arc::new(
//!     TransferOrchestrator::new(config, gateway, sessions)
//!         .with_dtmf_router(Arc::new(InMemoryDtmfRouter::new()))
//!         .with_timeout_scheduler(Arc::new(TokioTimeoutScheduler::new(events_tx.clone()))),
//! );
//! tokio::spawn(orchestrator.clone().run(events_rx));
//!
//! let output = orchestrator.request_transfer("support_agent", "call-1").await;
//! println!("{}", output.to_json());
//! ```

mod dtmf;
mod error;
mod events;
mod timeout;
mod tool;
mod transfer;

use std::sync::Arc;

use agent_tools::ToolRegistry;
use ari_client::CallControl;
use call_core::TelephonyConfig;

pub use dtmf::{DtmfRouter, InMemoryDtmfRouter};
pub use error::{TransferError, TriggerError};
pub use events::{TransferEvent, APP_ARGS_PREFIX};
pub use timeout::{TimeoutScheduler, TokioTimeoutScheduler};
pub use tool::AttendedTransfer;
pub use transfer::{TransferOrchestrator, ACCEPT_DIGIT, DECLINE_DIGIT};

// Re-export commonly used types from dependencies
pub use agent_tools::{CallContext, ToolArgs, ToolOutput, ToolStatus};
pub use call_core::{CallSession, InMemorySessionStore, SessionStore, TransferDecision};

/// Create a registry with every telephony tool, including `attended_transfer`.
pub fn transfer_registry(
    orchestrator: Arc<TransferOrchestrator>,
    gateway: Arc<dyn CallControl>,
    config: Arc<TelephonyConfig>,
) -> ToolRegistry {
    let mut registry = agent_tools::telephony_registry(gateway, config);
    registry.register(AttendedTransfer::new(orchestrator));
    registry
}
