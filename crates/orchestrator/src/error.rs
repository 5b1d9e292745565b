//! Error types for transfer orchestration.

use agent_tools::ToolOutput;
use ari_client::GatewayError;
use call_core::SessionError;
use thiserror::Error;

/// Errors that end a transfer request.
///
/// The display text is the message returned to the conversation layer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The feature or the requested destination does not permit a transfer.
    #[error("{0}")]
    Configuration(String),

    /// No dial endpoint could be derived for the destination.
    #[error("Unable to resolve dial endpoint for {0}")]
    Resolution(String),

    /// The agent leg could not be placed.
    #[error("Unable to place the transfer call to {description}.")]
    Gateway {
        description: String,
        #[source]
        source: GatewayError,
    },

    /// The call session is missing, busy, or could not be updated.
    #[error("{0}")]
    Session(String),
}

impl TransferError {
    /// Render as a `failed` tool output.
    pub fn into_output(self) -> ToolOutput {
        ToolOutput::failure(self.to_string())
    }
}

impl From<SessionError> for TransferError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(call_id) => {
                TransferError::Session(format!("No active call session for {}", call_id))
            }
            other => TransferError::Session(other.to_string()),
        }
    }
}

/// Errors from the optional DTMF router and timeout scheduler.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The agent channel is already routed to another call.
    #[error("channel {channel_id} is already registered to call {call_id}")]
    AlreadyRegistered { channel_id: String, call_id: String },

    /// The trigger cannot deliver events anymore.
    #[error("trigger unavailable: {0}")]
    Unavailable(String),
}
