//! Typed telephony configuration.
//!
//! The configuration is parsed from JSON and validated once at load time.
//! Missing sections fall back to defaults; blank values that have a sensible
//! default are normalized rather than rejected.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "TELEPHONY_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/telephony.json";

/// Application name agent legs are routed to.
pub const DEFAULT_APP_NAME: &str = "ai-voice-agent";

/// Channel technology used when nothing more specific is configured.
pub const DEFAULT_TECHNOLOGY: &str = "PJSIP";

pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_MOH_CLASS: &str = "default";

/// Top-level telephony configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    /// Stasis application that originated legs enter.
    pub app_name: String,
    pub ai_identity: AiIdentity,
    pub attended_transfer: AttendedTransferConfig,
    pub transfer: TransferConfig,
    pub extensions: ExtensionsConfig,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            ai_identity: AiIdentity::default(),
            attended_transfer: AttendedTransferConfig::default(),
            transfer: TransferConfig::default(),
            extensions: ExtensionsConfig::default(),
        }
    }
}

/// Caller identity presented to agents on transfer legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiIdentity {
    pub name: String,
    pub number: String,
}

impl Default for AiIdentity {
    fn default() -> Self {
        Self {
            name: "AI Agent".to_string(),
            number: "6789".to_string(),
        }
    }
}

impl AiIdentity {
    /// Caller-id string in `"Name" <number>` form.
    pub fn caller_id(&self) -> String {
        format!("\"{}\" <{}>", self.name, self.number)
    }
}

/// Attended transfer feature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendedTransferConfig {
    pub enabled: bool,
    /// How long the agent leg may ring before the transfer times out.
    pub dial_timeout_seconds: u64,
    /// Music-on-hold class played to the caller.
    pub moh_class: String,
    /// Audio capture state after the caller is bridged to the agent.
    pub resume_capture_on_accept: bool,
}

impl Default for AttendedTransferConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dial_timeout_seconds: DEFAULT_DIAL_TIMEOUT_SECS,
            moh_class: DEFAULT_MOH_CLASS.to_string(),
            resume_capture_on_accept: false,
        }
    }
}

/// Transfer destinations and dialing defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Default channel technology for `<tech>/<extension>` dial strings.
    pub technology: Option<String>,
    pub destinations: BTreeMap<String, DestinationConfig>,
}

impl TransferConfig {
    /// The configured default technology, or [`DEFAULT_TECHNOLOGY`].
    pub fn technology(&self) -> &str {
        self.technology.as_deref().unwrap_or(DEFAULT_TECHNOLOGY)
    }
}

/// Kind of transfer destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Extension,
    Queue,
    RingGroup,
    #[serde(other)]
    Other,
}

impl Default for DestinationType {
    fn default() -> Self {
        DestinationType::Other
    }
}

/// A named transfer destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(rename = "type", default)]
    pub kind: DestinationType,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub attended_allowed: bool,
    #[serde(default)]
    pub dial_string: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DestinationConfig {
    /// An extension destination that allows attended transfer.
    pub fn extension(target: impl Into<String>) -> Self {
        Self {
            kind: DestinationType::Extension,
            target: target.into(),
            attended_allowed: true,
            dial_string: None,
            description: None,
        }
    }

    pub fn with_dial_string(mut self, dial_string: impl Into<String>) -> Self {
        self.dial_string = Some(dial_string.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Display name, falling back to the destination key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(key)
    }
}

/// Internal extension directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub internal: BTreeMap<String, ExtensionConfig>,
}

/// Per-extension dialing and device-state settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub name: Option<String>,
    pub dial_string: Option<String>,
    /// Explicit device state name (e.g. `PJSIP/2765`).
    pub device_state_id: Option<String>,
    /// Technology for the device state name; `auto` means unset.
    pub device_state_tech: Option<String>,
}

impl ExtensionConfig {
    pub fn with_dial_string(dial_string: impl Into<String>) -> Self {
        Self {
            dial_string: Some(dial_string.into()),
            ..Self::default()
        }
    }
}

impl TelephonyConfig {
    /// Parse and validate configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TelephonyConfig = serde_json::from_str(json)?;
        config.validate()
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        info!(
            "Loaded telephony config from {} ({} destinations, {} extensions)",
            path.display(),
            config.transfer.destinations.len(),
            config.extensions.internal.len()
        );
        Ok(config)
    }

    /// Load configuration from the file named by `TELEPHONY_CONFIG`.
    ///
    /// `ARI_APP_NAME`, when set, overrides `app_name`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        if let Ok(app_name) = env::var("ARI_APP_NAME") {
            config.app_name = app_name;
            config = config.validate()?;
        }
        Ok(config)
    }

    /// Normalize defaults and reject values that cannot work.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.app_name = self.app_name.trim().to_string();
        if self.app_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "app_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let defaults = AiIdentity::default();
        if self.ai_identity.name.trim().is_empty() {
            self.ai_identity.name = defaults.name;
        }
        if self.ai_identity.number.trim().is_empty() {
            self.ai_identity.number = defaults.number;
        }

        let attended = &mut self.attended_transfer;
        if attended.dial_timeout_seconds == 0 {
            debug!("dial_timeout_seconds is 0, using {}", DEFAULT_DIAL_TIMEOUT_SECS);
            attended.dial_timeout_seconds = DEFAULT_DIAL_TIMEOUT_SECS;
        }
        if attended.moh_class.trim().is_empty() {
            attended.moh_class = DEFAULT_MOH_CLASS.to_string();
        }

        self.transfer.technology = normalize_opt(self.transfer.technology.take());

        for (key, destination) in self.transfer.destinations.iter_mut() {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "transfer.destinations".to_string(),
                    reason: "destination keys must not be empty".to_string(),
                });
            }
            destination.dial_string = normalize_opt(destination.dial_string.take());
        }

        for extension in self.extensions.internal.values_mut() {
            extension.dial_string = normalize_opt(extension.dial_string.take());
            extension.device_state_id = normalize_opt(extension.device_state_id.take());
            extension.device_state_tech = normalize_opt(extension.device_state_tech.take());
        }

        Ok(self)
    }

    /// Look up a destination by key.
    pub fn destination(&self, key: &str) -> Option<&DestinationConfig> {
        self.transfer.destinations.get(key)
    }

    /// Look up an internal extension by its key.
    pub fn extension(&self, extension: &str) -> Option<&ExtensionConfig> {
        self.extensions.internal.get(extension)
    }
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
