//! The attended transfer state machine.

use std::sync::Arc;
use std::time::Duration;

use agent_tools::ToolOutput;
use ari_client::{CallControl, OriginateRequest};
use call_core::{
    ActionType, CallSession, CasOutcome, DestinationConfig, DestinationType, SessionError,
    SessionStore, TelephonyConfig, TransferAction, TransferDecision,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dtmf::DtmfRouter;
use crate::error::TransferError;
use crate::events::{TransferEvent, APP_ARGS_PREFIX};
use crate::timeout::TimeoutScheduler;

/// Digit the agent presses to take the call.
pub const ACCEPT_DIGIT: char = '1';

/// Digit the agent presses to refuse the call.
pub const DECLINE_DIGIT: char = '2';

/// Attempts at a compare-and-swap write before giving up.
const MAX_CAS_ATTEMPTS: u32 = 8;

/// A destination that passed every precondition.
#[derive(Debug, Clone, PartialEq)]
struct TransferPlan {
    destination_key: String,
    target: String,
    description: String,
    dial_endpoint: String,
}

/// Drives attended transfers for active calls.
///
/// A request puts the caller on hold, dials the agent and returns right
/// away. Exactly one of a DTMF decision, a timeout or an agent hangup then
/// resolves the transfer; every transition out of `pending` is a
/// compare-and-swap on the session record, so concurrent triggers cannot
/// both apply.
pub struct TransferOrchestrator {
    config: Arc<TelephonyConfig>,
    gateway: Arc<dyn CallControl>,
    sessions: Arc<dyn SessionStore>,
    dtmf_router: Option<Arc<dyn DtmfRouter>>,
    timeouts: Option<Arc<dyn TimeoutScheduler>>,
}

impl TransferOrchestrator {
    /// Create an orchestrator without DTMF routing or timeout guards.
    pub fn new(
        config: Arc<TelephonyConfig>,
        gateway: Arc<dyn CallControl>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            gateway,
            sessions,
            dtmf_router: None,
            timeouts: None,
        }
    }

    /// Route agent-leg events through `router`.
    pub fn with_dtmf_router(mut self, router: Arc<dyn DtmfRouter>) -> Self {
        self.dtmf_router = Some(router);
        self
    }

    /// Guard unanswered agent legs with `scheduler`.
    pub fn with_timeout_scheduler(mut self, scheduler: Arc<dyn TimeoutScheduler>) -> Self {
        self.timeouts = Some(scheduler);
        self
    }

    pub fn config(&self) -> &TelephonyConfig {
        &self.config
    }

    /// Start an attended transfer of `call_id` to the configured destination.
    ///
    /// Never fails: precondition, resolution and gateway problems come back
    /// as a `failed` output.
    pub async fn request_transfer(&self, destination_key: &str, call_id: &str) -> ToolOutput {
        match self.try_request_transfer(destination_key.trim(), call_id).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Transfer request for {} to '{}' failed: {}", call_id, destination_key, e);
                e.into_output()
            }
        }
    }

    /// Run [`request_transfer`](Self::request_transfer) on its own task.
    ///
    /// The request keeps going if the caller stops waiting, so a claimed
    /// session always ends up armed or rolled back.
    pub async fn spawn_request(self: &Arc<Self>, destination_key: &str, call_id: &str) -> ToolOutput {
        let orchestrator = Arc::clone(self);
        let destination_key = destination_key.to_string();
        let call_id = call_id.to_string();
        let task = tokio::spawn(async move {
            orchestrator
                .request_transfer(&destination_key, &call_id)
                .await
        });

        match task.await {
            Ok(output) => output,
            Err(e) => {
                error!("Transfer task failed: {}", e);
                ToolOutput::error(format!("Transfer task failed: {}", e))
            }
        }
    }

    async fn try_request_transfer(
        &self,
        destination_key: &str,
        call_id: &str,
    ) -> Result<ToolOutput, TransferError> {
        let plan = self.plan(destination_key)?;
        let attended = &self.config.attended_transfer;

        let action = TransferAction::attended(
            &plan.destination_key,
            &plan.target,
            &plan.description,
            &plan.dial_endpoint,
            attended.dial_timeout_seconds,
            &attended.moh_class,
        );
        let session = self.claim(call_id, &action).await?;
        let caller = session.caller_channel_id.clone();

        info!(
            "Starting attended transfer of {} to {} via {}",
            call_id, plan.destination_key, plan.dial_endpoint
        );

        if let Err(e) = self.gateway.start_moh(&caller, &action.moh_class).await {
            warn!("Failed to start hold music on {}: {}", caller, e);
        }

        let request = OriginateRequest::new(&plan.dial_endpoint, &self.config.app_name)
            .caller_id(self.config.ai_identity.caller_id())
            .timeout_secs(action.dial_timeout_seconds)
            .app_args([APP_ARGS_PREFIX, call_id, plan.destination_key.as_str()])
            .variable("AGENT_ACTION", ActionType::AttendedTransfer.as_str())
            .variable("AGENT_CALL_ID", call_id)
            .variable("AGENT_TARGET", &plan.target)
            .variable("AGENT_DESTINATION_KEY", &plan.destination_key);

        let agent_channel_id = match self.gateway.originate(&request).await {
            Ok(id) => id,
            Err(source) => {
                error!("Failed to originate agent leg to {}: {}", plan.dial_endpoint, source);
                self.rollback(call_id, &caller, &action).await;
                return Err(TransferError::Gateway {
                    description: plan.description,
                    source,
                });
            }
        };

        let recorded = self
            .update_session(call_id, |s| match s.current_action.as_mut() {
                Some(a) if is_same_attempt(a, &action) && a.agent_channel_id.is_none() => {
                    a.agent_channel_id = Some(agent_channel_id.clone());
                    true
                }
                _ => false,
            })
            .await;
        if !matches!(recorded, Ok(Some(_))) {
            warn!(
                "Transfer for {} was cleared before agent leg {} was recorded",
                call_id, agent_channel_id
            );
            self.hangup_best_effort(&agent_channel_id).await;
            return Err(TransferError::Session(
                "The transfer was cancelled before the agent was reached".to_string(),
            ));
        }

        self.arm_triggers(call_id, &agent_channel_id, action.dial_timeout_seconds)
            .await;

        info!(
            "Agent leg {} placed for {} ({})",
            agent_channel_id, call_id, plan.description
        );
        Ok(ToolOutput::success(format!(
            "Please hold while I connect you to {}.",
            plan.description
        ))
        .with_field("destination", plan.destination_key)
        .with_field("type", ActionType::AttendedTransfer.as_str()))
    }

    /// Check preconditions and resolve the dial endpoint.
    fn plan(&self, destination_key: &str) -> Result<TransferPlan, TransferError> {
        if !self.config.attended_transfer.enabled {
            return Err(TransferError::Configuration(
                "Attended transfer is not enabled".to_string(),
            ));
        }
        if destination_key.is_empty() {
            return Err(TransferError::Configuration("Missing destination".to_string()));
        }

        let destination = self.config.destination(destination_key).ok_or_else(|| {
            TransferError::Configuration(format!("Unknown destination: {}", destination_key))
        })?;
        if destination.kind != DestinationType::Extension {
            return Err(TransferError::Configuration(
                "Attended transfer is only supported for extension destinations".to_string(),
            ));
        }
        if !destination.attended_allowed {
            return Err(TransferError::Configuration(format!(
                "Attended transfer is not allowed for destination: {}",
                destination_key
            )));
        }

        let target = destination.target.trim();
        if target.is_empty() {
            return Err(TransferError::Configuration(format!(
                "Invalid destination target for: {}",
                destination_key
            )));
        }

        let dial_endpoint = self
            .resolve_dial_endpoint(destination, target)
            .ok_or_else(|| TransferError::Resolution(destination_key.to_string()))?;

        Ok(TransferPlan {
            destination_key: destination_key.to_string(),
            target: target.to_string(),
            description: destination.display_name(destination_key).to_string(),
            dial_endpoint,
        })
    }

    /// Endpoint for the agent leg.
    ///
    /// First match wins: the destination's dial string, the target
    /// extension's dial string, `<technology>/<target>`.
    pub fn resolve_dial_endpoint(
        &self,
        destination: &DestinationConfig,
        target: &str,
    ) -> Option<String> {
        if let Some(dial) = non_blank(destination.dial_string.as_deref()) {
            return Some(dial.to_string());
        }

        let target = target.trim();
        if let Some(dial) = self
            .config
            .extension(target)
            .and_then(|ext| non_blank(ext.dial_string.as_deref()))
        {
            return Some(dial.to_string());
        }

        let technology = self.config.transfer.technology().trim();
        if technology.is_empty() || target.is_empty() {
            return None;
        }
        Some(format!("{}/{}", technology, target))
    }

    /// Install `action` as the session's pending transfer.
    async fn claim(&self, call_id: &str, action: &TransferAction) -> Result<CallSession, TransferError> {
        let mut busy = false;
        let claimed = self
            .update_session(call_id, |s| {
                if s.has_pending_transfer() {
                    busy = true;
                    return false;
                }
                s.current_action = Some(action.clone());
                s.audio_capture_enabled = false;
                true
            })
            .await?;

        match claimed {
            Some(session) => Ok(session),
            None if busy => Err(TransferError::Session(
                "A transfer is already in progress".to_string(),
            )),
            None => Err(SessionError::NotFound(call_id.to_string()).into()),
        }
    }

    /// Undo a claim whose origination failed.
    async fn rollback(&self, call_id: &str, caller_channel_id: &str, action: &TransferAction) {
        if let Err(e) = self.gateway.stop_moh(caller_channel_id).await {
            warn!("Failed to stop hold music on {}: {}", caller_channel_id, e);
        }

        let cleared = self
            .update_session(call_id, |s| match s.current_action.as_ref() {
                Some(a) if is_same_attempt(a, action) => {
                    s.last_transfer = Some(a.resolved(TransferDecision::Failed, None));
                    s.current_action = None;
                    s.audio_capture_enabled = true;
                    true
                }
                _ => false,
            })
            .await;
        if let Err(e) = cleared {
            error!("Failed to clear transfer for {}: {}", call_id, e);
        }
    }

    async fn arm_triggers(&self, call_id: &str, agent_channel_id: &str, timeout_secs: u64) {
        match &self.dtmf_router {
            Some(router) => {
                if let Err(e) = router.register(agent_channel_id, call_id).await {
                    warn!("Failed to register DTMF route for {}: {}", agent_channel_id, e);
                }
            }
            None => debug!("No DTMF router; {} will not receive digits", agent_channel_id),
        }

        match &self.timeouts {
            Some(scheduler) => {
                if let Err(e) = scheduler
                    .schedule(call_id, agent_channel_id, Duration::from_secs(timeout_secs))
                    .await
                {
                    warn!("Failed to schedule transfer timeout for {}: {}", agent_channel_id, e);
                }
            }
            None => debug!("No timeout scheduler; {} has no no-answer guard", agent_channel_id),
        }
    }

    async fn release_triggers(&self, call_id: &str, agent_channel_id: &str) {
        if let Some(router) = &self.dtmf_router {
            router.unregister(agent_channel_id).await;
        }
        if let Some(scheduler) = &self.timeouts {
            scheduler.cancel(call_id, agent_channel_id).await;
        }
    }

    /// Handle a digit pressed on the agent leg.
    ///
    /// Returns the decision that was applied, or `None` if the digit was
    /// ignored or the transfer had already resolved.
    pub async fn handle_dtmf(
        &self,
        call_id: &str,
        agent_channel_id: &str,
        digit: char,
    ) -> Option<TransferDecision> {
        match digit {
            ACCEPT_DIGIT => self.accept(call_id, agent_channel_id).await,
            DECLINE_DIGIT => {
                let session = self
                    .finish(call_id, agent_channel_id, TransferDecision::Decline, Some(digit), true)
                    .await?;
                self.hangup_best_effort(agent_channel_id).await;
                self.stop_moh_best_effort(&session.caller_channel_id).await;
                info!("Agent {} declined transfer for {}", agent_channel_id, call_id);
                Some(TransferDecision::Decline)
            }
            other => {
                debug!("Ignoring DTMF '{}' from {}", other, agent_channel_id);
                None
            }
        }
    }

    async fn accept(&self, call_id: &str, agent_channel_id: &str) -> Option<TransferDecision> {
        let resume_capture = self.config.attended_transfer.resume_capture_on_accept;
        let session = self
            .finish(
                call_id,
                agent_channel_id,
                TransferDecision::Accept,
                Some(ACCEPT_DIGIT),
                resume_capture,
            )
            .await?;
        let caller = session.caller_channel_id.as_str();

        match self.gateway.bridge(caller, agent_channel_id).await {
            Ok(bridge_id) => {
                self.stop_moh_best_effort(caller).await;
                info!(
                    "Bridged {} with agent {} in {} for {}",
                    caller, agent_channel_id, bridge_id, call_id
                );
                Some(TransferDecision::Accept)
            }
            Err(e) => {
                error!("Failed to bridge {} with agent {}: {}", caller, agent_channel_id, e);
                self.hangup_best_effort(agent_channel_id).await;
                self.stop_moh_best_effort(caller).await;

                let downgraded = self
                    .update_session(call_id, |s| match s.last_transfer.as_mut() {
                        Some(a)
                            if a.matches_agent(agent_channel_id)
                                && a.decision == TransferDecision::Accept =>
                        {
                            a.decision = TransferDecision::Failed;
                            s.audio_capture_enabled = true;
                            true
                        }
                        _ => false,
                    })
                    .await;
                if let Err(e) = downgraded {
                    error!("Failed to record bridge failure for {}: {}", call_id, e);
                }
                Some(TransferDecision::Failed)
            }
        }
    }

    /// Handle expiry of the no-answer guard.
    pub async fn handle_timeout(
        &self,
        call_id: &str,
        agent_channel_id: &str,
    ) -> Option<TransferDecision> {
        let session = self
            .finish(call_id, agent_channel_id, TransferDecision::Timeout, None, true)
            .await?;

        let answered = session
            .last_transfer
            .as_ref()
            .map(|a| a.answered)
            .unwrap_or(false);
        if !answered {
            self.hangup_best_effort(agent_channel_id).await;
        }
        self.stop_moh_best_effort(&session.caller_channel_id).await;

        info!("Transfer for {} to {} timed out", call_id, agent_channel_id);
        Some(TransferDecision::Timeout)
    }

    /// Handle the agent leg disconnecting before a decision.
    pub async fn handle_agent_hangup(
        &self,
        call_id: &str,
        agent_channel_id: &str,
    ) -> Option<TransferDecision> {
        let session = self
            .finish(call_id, agent_channel_id, TransferDecision::Decline, None, true)
            .await?;
        self.stop_moh_best_effort(&session.caller_channel_id).await;

        info!("Agent {} hung up on transfer for {}", agent_channel_id, call_id);
        Some(TransferDecision::Decline)
    }

    /// Mark the pending transfer's agent leg as answered.
    pub async fn handle_agent_answered(&self, call_id: &str, agent_channel_id: &str) -> bool {
        let marked = self
            .update_session(call_id, |s| match s.current_action.as_mut() {
                Some(a) if a.is_pending_for(agent_channel_id) && !a.answered => {
                    a.answered = true;
                    true
                }
                _ => false,
            })
            .await;

        match marked {
            Ok(Some(_)) => {
                debug!("Agent {} answered transfer for {}", agent_channel_id, call_id);
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!("Ignoring answer from {}: {}", agent_channel_id, e);
                false
            }
        }
    }

    /// Apply a terminal decision if the transfer is still pending for
    /// `agent_channel_id`, returning the updated session.
    async fn finish(
        &self,
        call_id: &str,
        agent_channel_id: &str,
        decision: TransferDecision,
        digit: Option<char>,
        audio_capture_enabled: bool,
    ) -> Option<CallSession> {
        let applied = self
            .update_session(call_id, |s| match s.current_action.as_ref() {
                Some(a) if a.is_pending_for(agent_channel_id) => {
                    s.last_transfer = Some(a.resolved(decision, digit));
                    s.current_action = None;
                    s.audio_capture_enabled = audio_capture_enabled;
                    true
                }
                _ => false,
            })
            .await;

        match applied {
            Ok(Some(session)) => {
                self.release_triggers(call_id, agent_channel_id).await;
                Some(session)
            }
            Ok(None) => {
                debug!(
                    "No pending transfer for {} on {}; ignoring {}",
                    call_id, agent_channel_id, decision
                );
                None
            }
            Err(e) => {
                warn!("Could not apply {} for {}: {}", decision, call_id, e);
                None
            }
        }
    }

    /// Read-modify-write a session with compare-and-swap.
    ///
    /// `apply` returns `false` to leave the session untouched, in which case
    /// `Ok(None)` is returned.
    async fn update_session<F>(
        &self,
        call_id: &str,
        mut apply: F,
    ) -> Result<Option<CallSession>, SessionError>
    where
        F: FnMut(&mut CallSession) -> bool + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut session = self
                .sessions
                .get(call_id)
                .await?
                .ok_or_else(|| SessionError::NotFound(call_id.to_string()))?;

            if !apply(&mut session) {
                return Ok(None);
            }

            match self.sessions.compare_and_swap(session).await? {
                CasOutcome::Swapped(stored) => return Ok(Some(stored)),
                CasOutcome::Conflict => {
                    debug!("Session {} changed underneath us (attempt {})", call_id, attempt);
                }
            }
        }

        Err(SessionError::Contention {
            call_id: call_id.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    async fn hangup_best_effort(&self, channel_id: &str) {
        if let Err(e) = self.gateway.hangup(channel_id).await {
            warn!("Failed to hang up {}: {}", channel_id, e);
        }
    }

    async fn stop_moh_best_effort(&self, channel_id: &str) {
        if let Err(e) = self.gateway.stop_moh(channel_id).await {
            warn!("Failed to stop hold music on {}: {}", channel_id, e);
        }
    }

    /// Dispatch one transfer event.
    ///
    /// Channel-only events are routed to their call through the DTMF router
    /// and dropped when no route exists.
    pub async fn handle_event(&self, event: TransferEvent) {
        match event {
            TransferEvent::Dtmf { channel_id, digit } => {
                if let Some(call_id) = self.route(&channel_id).await {
                    self.handle_dtmf(&call_id, &channel_id, digit).await;
                }
            }
            TransferEvent::AgentAnswered {
                call_id,
                channel_id,
            } => {
                let call_id = match call_id {
                    Some(id) => Some(id),
                    None => self.route(&channel_id).await,
                };
                if let Some(call_id) = call_id {
                    self.handle_agent_answered(&call_id, &channel_id).await;
                }
            }
            TransferEvent::AgentHangup { channel_id } => {
                if let Some(call_id) = self.route(&channel_id).await {
                    self.handle_agent_hangup(&call_id, &channel_id).await;
                }
            }
            TransferEvent::Timeout {
                call_id,
                channel_id,
            } => {
                self.handle_timeout(&call_id, &channel_id).await;
            }
        }
    }

    async fn route(&self, channel_id: &str) -> Option<String> {
        let router = self.dtmf_router.as_ref()?;
        let call_id = router.lookup(channel_id).await;
        if call_id.is_none() {
            debug!("No transfer routed for channel {}", channel_id);
        }
        call_id
    }

    /// Consume transfer events until the channel closes.
    ///
    /// Each event is handled on its own task so a slow gateway call never
    /// holds up other calls.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransferEvent>) {
        info!("Transfer event loop started");
        while let Some(event) = events.recv().await {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                orchestrator.handle_event(event).await;
            });
        }
        info!("Transfer event loop stopped");
    }
}

fn is_same_attempt(current: &TransferAction, claimed: &TransferAction) -> bool {
    current.is_pending()
        && current.started_at == claimed.started_at
        && current.destination_key == claimed.destination_key
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
