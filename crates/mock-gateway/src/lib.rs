//! Mock call-control gateways for testing.
//!
//! This crate provides implementations of the `CallControl` trait that
//! never touch a real platform:
//! - `RecordingGateway` - Records every command and answers with scripted responses
//! - `DelayedGateway` - Wraps another gateway with artificial latency
//!
//! # Example
//!
//! ```rust
//! use mock_gateway::{CallControl, RecordingGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_gateway::GatewayError> {
//!     let gateway = RecordingGateway::new().with_device_state("SIP/6000", "NOT_INUSE");
//!
//!     let state = gateway.device_state("SIP/6000").await?;
//!     assert_eq!(state.state, "NOT_INUSE");
//!     assert_eq!(gateway.log(), vec!["GET deviceStates/SIP%2F6000"]);
//!     Ok(())
//! }
//! ```

mod delayed;
mod recording;

// Re-export gateway types for convenience
pub use ari_client::{async_trait, CallControl, Command, GatewayError, Method};

pub use delayed::DelayedGateway;
pub use recording::RecordingGateway;
