//! Extension status tool - queries the platform's device state for an extension.

use std::sync::Arc;
use std::time::Duration;

use ari_client::CallControl;
use async_trait::async_trait;
use call_core::TelephonyConfig;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::device_state::{
    check_availability, normalize_state, resolve_device_state_id, ResolutionSource,
};
use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput, ToolParameter};

/// Result of a device state lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStateResult {
    pub extension: String,
    pub device_state_id: String,
    pub resolution_source: ResolutionSource,
    /// Name reported by the platform, or the resolved id.
    pub device_state_name: String,
    /// Normalized state, or the raw value when normalization left nothing.
    pub device_state: String,
    pub available: bool,
}

impl From<DeviceStateResult> for ToolOutput {
    fn from(result: DeviceStateResult) -> Self {
        ToolOutput::success("")
            .with_field("extension", result.extension)
            .with_field("device_state_id", result.device_state_id)
            .with_field("resolution_source", result.resolution_source.as_str())
            .with_field("device_state_name", result.device_state_name)
            .with_field("device_state", result.device_state)
            .with_field("available", Value::Bool(result.available))
    }
}

/// Checks whether an internal extension can take a call.
///
/// Use before attempting a transfer to a live agent.
///
/// # Parameters
///
/// - `extension` (required): Extension number to check (e.g. "2765").
/// - `tech` (optional): Channel technology (e.g. "PJSIP", "SIP"). Defaults
///   to the extension directory and its dial string.
/// - `device_state_id` (optional): Explicit device state name; overrides
///   tech/extension resolution.
///
/// # Examples
///
/// ```json
/// {"extension": "2765"}
/// {"extension": "2765", "tech": "PJSIP"}
/// {"extension": "agent", "device_state_id": "Custom:agentA"}
/// ```
pub struct CheckExtensionStatus {
    gateway: Arc<dyn CallControl>,
    config: Arc<TelephonyConfig>,
}

impl CheckExtensionStatus {
    /// Create a new extension status tool.
    pub fn new(gateway: Arc<dyn CallControl>, config: Arc<TelephonyConfig>) -> Self {
        Self { gateway, config }
    }
}

#[async_trait]
impl Tool for CheckExtensionStatus {
    fn name(&self) -> &str {
        "check_extension_status"
    }

    fn description(&self) -> &str {
        "Check if an internal extension is available by querying its device state. \
         Use this before attempting a transfer to a live agent."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("extension", "Extension number to check (e.g., '2765')."),
            ToolParameter::optional(
                "tech",
                "Channel technology for device state (e.g., 'PJSIP', 'SIP').",
            ),
            ToolParameter::optional(
                "device_state_id",
                "Explicit device state id to query (e.g., 'PJSIP/2765').",
            ),
        ]
    }

    fn max_execution_time(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let extension = args.get_trimmed("extension").unwrap_or_default();
        let tech = args.get_trimmed("tech").unwrap_or_default();
        let explicit_id = args.get_trimmed("device_state_id").unwrap_or_default();

        let resolution =
            resolve_device_state_id(&extension, &tech, &explicit_id, &self.config.extensions);
        if !resolution.is_resolved() {
            debug!("No device state id for extension '{}'", extension);
            return Ok(ToolOutput::error(
                "Unable to resolve device state id. Provide tech/device_state_id, or configure \
                 device_state_tech/device_state_id for the extension.",
            )
            .with_field("extension", extension));
        }

        let device_state_id = resolution.device_state_id;
        let reported = match self.gateway.device_state(&device_state_id).await {
            Ok(state) => state,
            Err(e) => {
                error!(
                    "Device state query failed for {} ({}): {}",
                    extension, device_state_id, e
                );
                return Ok(ToolOutput::error("Device state query failed")
                    .with_field("error", e.to_string()));
            }
        };

        let normalized = normalize_state(&reported.state);
        let available = check_availability(&reported.state);
        let result = DeviceStateResult {
            device_state_name: if reported.name.is_empty() {
                device_state_id.clone()
            } else {
                reported.name
            },
            device_state: if normalized.is_empty() {
                reported.state
            } else {
                normalized
            },
            extension,
            device_state_id,
            resolution_source: resolution.source,
            available,
        };

        info!(
            "Extension {} device state {} = {} (available: {}, source: {})",
            result.extension,
            result.device_state_id,
            result.device_state,
            result.available,
            result.resolution_source
        );

        Ok(result.into())
    }
}
