//! The `attended_transfer` tool.

use std::sync::Arc;
use std::time::Duration;

use agent_tools::{async_trait, Tool, ToolArgs, ToolError, ToolOutput, ToolParameter};

use crate::transfer::TransferOrchestrator;

/// Warm-transfers the active caller to a configured destination.
///
/// # Parameters
///
/// - `destination` (alias `target`): Key of a configured transfer
///   destination (e.g. "support_agent").
pub struct AttendedTransfer {
    orchestrator: Arc<TransferOrchestrator>,
}

impl AttendedTransfer {
    pub fn new(orchestrator: Arc<TransferOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for AttendedTransfer {
    fn name(&self) -> &str {
        "attended_transfer"
    }

    fn description(&self) -> &str {
        "Warm-transfer the caller to a configured destination. The caller hears hold music \
         while the agent is dialed; the agent presses 1 to accept or 2 to decline."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::optional(
                "destination",
                "Key of the configured transfer destination (e.g., 'support_agent').",
            ),
            ToolParameter::optional("target", "Alias for 'destination'."),
        ]
    }

    fn requires_call(&self) -> bool {
        true
    }

    fn max_execution_time(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let call = args.require_call(self.name())?;
        let destination = args
            .get_first(&["destination", "target"])
            .unwrap_or_default();

        Ok(self
            .orchestrator
            .spawn_request(&destination, &call.call_id)
            .await)
    }
}
