//! Call-control gateway for the Asterisk REST Interface (ARI).
//!
//! This crate provides:
//!
//! - [`CallControl`] - The gateway trait the orchestrator depends on
//! - [`Command`] - A single REST command (method, resource, params, body)
//! - [`AriClient`] - A `reqwest`-based implementation of [`CallControl`]
//!
//! # Example
//!
//! ```no_run
//! use ari_client::{AriClient, AriConfig, CallControl};
//!
//! # async fn example() -> Result<(), ari_client::GatewayError> {
//! let client = AriClient::connect(AriConfig::from_env()?).await?;
//!
//! let state = client.device_state("PJSIP/2765").await?;
//! println!("{} is {}", state.name, state.state);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod gateway;

pub use client::AriClient;
pub use command::{encode_path_segment, Command, DeviceState, Method, OriginateRequest};
pub use config::AriConfig;
pub use error::GatewayError;
pub use gateway::CallControl;

// Re-export async_trait for implementors
pub use async_trait::async_trait;
