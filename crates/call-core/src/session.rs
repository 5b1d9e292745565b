//! Per-call session state and the transfer action it owns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of in-call action held on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AttendedTransfer,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AttendedTransfer => "attended_transfer",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a transfer attempt.
///
/// `Pending` is the only non-terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDecision {
    Pending,
    Accept,
    Decline,
    Timeout,
    Failed,
}

impl TransferDecision {
    /// Whether this decision ends the transfer.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferDecision::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDecision::Pending => "pending",
            TransferDecision::Accept => "accept",
            TransferDecision::Decline => "decline",
            TransferDecision::Timeout => "timeout",
            TransferDecision::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attended transfer in flight for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    /// Key of the configured destination that was requested.
    pub destination_key: String,
    /// Target extension.
    pub target: String,
    /// Display name used in caller-facing messages.
    pub target_name: String,
    /// Endpoint the agent leg is dialed on (e.g. `PJSIP/2765`).
    pub dial_endpoint: String,
    pub dial_timeout_seconds: u64,
    pub moh_class: String,
    pub started_at: DateTime<Utc>,
    /// Set only after origination returned a channel id.
    pub agent_channel_id: Option<String>,
    /// Whether the agent leg has answered.
    pub answered: bool,
    pub decision: TransferDecision,
    pub decision_digit: Option<char>,
}

impl TransferAction {
    /// Create a pending attended transfer action.
    pub fn attended(
        destination_key: impl Into<String>,
        target: impl Into<String>,
        target_name: impl Into<String>,
        dial_endpoint: impl Into<String>,
        dial_timeout_seconds: u64,
        moh_class: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionType::AttendedTransfer,
            destination_key: destination_key.into(),
            target: target.into(),
            target_name: target_name.into(),
            dial_endpoint: dial_endpoint.into(),
            dial_timeout_seconds,
            moh_class: moh_class.into(),
            started_at: Utc::now(),
            agent_channel_id: None,
            answered: false,
            decision: TransferDecision::Pending,
            decision_digit: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.decision == TransferDecision::Pending
    }

    /// Whether the action's agent leg is `channel_id`.
    pub fn matches_agent(&self, channel_id: &str) -> bool {
        self.agent_channel_id.as_deref() == Some(channel_id)
    }

    /// Whether a trigger from `channel_id` may still resolve this action.
    pub fn is_pending_for(&self, channel_id: &str) -> bool {
        self.is_pending() && self.matches_agent(channel_id)
    }

    /// Return a copy carrying a terminal decision.
    pub fn resolved(&self, decision: TransferDecision, digit: Option<char>) -> Self {
        let mut action = self.clone();
        action.decision = decision;
        action.decision_digit = digit;
        action
    }
}

/// Mutable per-call state shared by the request and event handlers.
///
/// `version` is maintained by the [`SessionStore`](crate::SessionStore): a
/// compare-and-swap write only lands if the stored version still equals the
/// version that was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: String,
    pub caller_channel_id: String,
    /// The action currently in progress, if any.
    pub current_action: Option<TransferAction>,
    /// Whether caller audio is fed to the capture pipeline.
    pub audio_capture_enabled: bool,
    /// The most recently resolved transfer, with its final decision.
    pub last_transfer: Option<TransferAction>,
    pub version: u64,
}

impl CallSession {
    /// Create a fresh session with capture enabled and no action.
    pub fn new(call_id: impl Into<String>, caller_channel_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            caller_channel_id: caller_channel_id.into(),
            current_action: None,
            audio_capture_enabled: true,
            last_transfer: None,
            version: 0,
        }
    }

    /// The pending transfer, if one is in progress.
    pub fn pending_transfer(&self) -> Option<&TransferAction> {
        self.current_action.as_ref().filter(|a| a.is_pending())
    }

    pub fn has_pending_transfer(&self) -> bool {
        self.pending_transfer().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> TransferAction {
        TransferAction::attended("support_agent", "2765", "Support", "PJSIP/2765", 30, "default")
    }

    #[test]
    fn test_new_action_is_pending() {
        let action = action();
        assert!(action.is_pending());
        assert_eq!(action.kind, ActionType::AttendedTransfer);
        assert!(action.agent_channel_id.is_none());
        assert!(!action.answered);
    }

    #[test]
    fn test_pending_for_requires_matching_channel() {
        let mut action = action();
        assert!(!action.is_pending_for("agent-1"));

        action.agent_channel_id = Some("agent-1".to_string());
        assert!(action.is_pending_for("agent-1"));
        assert!(!action.is_pending_for("agent-2"));

        let done = action.resolved(TransferDecision::Accept, Some('1'));
        assert!(!done.is_pending_for("agent-1"));
        assert_eq!(done.decision_digit, Some('1'));
    }

    #[test]
    fn test_decision_terminality() {
        assert!(!TransferDecision::Pending.is_terminal());
        for decision in [
            TransferDecision::Accept,
            TransferDecision::Decline,
            TransferDecision::Timeout,
            TransferDecision::Failed,
        ] {
            assert!(decision.is_terminal());
        }
    }

    #[test]
    fn test_action_serializes_type_field() {
        let json = serde_json::to_value(action()).unwrap();
        assert_eq!(json["type"], "attended_transfer");
        assert_eq!(json["decision"], "pending");
    }

    #[test]
    fn test_session_pending_transfer() {
        let mut session = CallSession::new("call-1", "caller-1");
        assert!(!session.has_pending_transfer());

        session.current_action = Some(action());
        assert!(session.has_pending_transfer());

        session.current_action = Some(action().resolved(TransferDecision::Timeout, None));
        assert!(!session.has_pending_transfer());
    }
}
