//! Events that drive a pending transfer to its terminal state.

use serde::Deserialize;
use serde_json::Value;

/// `appArgs` prefix that marks an originated agent leg.
pub const APP_ARGS_PREFIX: &str = "attended-transfer";

/// A trigger for a pending transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// The agent pressed a key.
    Dtmf { channel_id: String, digit: char },
    /// The agent leg answered and entered the application.
    AgentAnswered {
        call_id: Option<String>,
        channel_id: String,
    },
    /// The agent leg went away.
    AgentHangup { channel_id: String },
    /// The no-answer guard for an agent leg expired.
    Timeout { call_id: String, channel_id: String },
}

#[derive(Debug, Deserialize)]
struct AriEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    digit: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    channel: Option<AriChannel>,
}

#[derive(Debug, Deserialize)]
struct AriChannel {
    id: String,
}

impl TransferEvent {
    /// Map a platform event to a transfer event.
    ///
    /// Returns `None` for events that do not concern an agent leg, such as
    /// the caller's own `StasisStart`.
    pub fn from_ari_event(event: &Value) -> Option<Self> {
        let event = AriEvent::deserialize(event).ok()?;
        let channel_id = event.channel?.id;

        match event.kind.as_str() {
            "ChannelDtmfReceived" => {
                let digit = event.digit?.chars().next()?;
                Some(TransferEvent::Dtmf { channel_id, digit })
            }
            "StasisStart" => {
                let mut args = event.args.iter().map(|a| a.trim());
                if args.next()? != APP_ARGS_PREFIX {
                    return None;
                }
                let call_id = args.next().filter(|id| !id.is_empty()).map(str::to_string);
                Some(TransferEvent::AgentAnswered {
                    call_id,
                    channel_id,
                })
            }
            "ChannelHangupRequest" | "ChannelDestroyed" | "StasisEnd" => {
                Some(TransferEvent::AgentHangup { channel_id })
            }
            _ => None,
        }
    }

    /// Parse a raw event message.
    pub fn from_json_str(json: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(json).ok()?;
        Self::from_ari_event(&value)
    }

    /// The agent channel the event concerns.
    pub fn channel_id(&self) -> &str {
        match self {
            TransferEvent::Dtmf { channel_id, .. }
            | TransferEvent::AgentAnswered { channel_id, .. }
            | TransferEvent::AgentHangup { channel_id }
            | TransferEvent::Timeout { channel_id, .. } => channel_id,
        }
    }
}
