//! Device state name resolution and availability mapping.
//!
//! A device state name is usually `<TECH>/<EXT>` (e.g. `PJSIP/2765` or
//! `SIP/6000`). Which technology applies to an extension can come from the
//! caller, from the extension directory, or from the extension's dial string.

use std::fmt;

use call_core::{ExtensionConfig, ExtensionsConfig};

/// State value that means the device is idle and reachable.
pub const AVAILABLE_STATE: &str = "NOT_INUSE";

/// Where a resolved device state name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    ParameterDeviceStateId,
    ConfigDeviceStateId,
    ConfigDeviceStateTech,
    ConfigDialString,
    ParameterTech,
    Unresolved,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::ParameterDeviceStateId => "parameter.device_state_id",
            ResolutionSource::ConfigDeviceStateId => "config.device_state_id",
            ResolutionSource::ConfigDeviceStateTech => "config.device_state_tech",
            ResolutionSource::ConfigDialString => "config.dial_string",
            ResolutionSource::ParameterTech => "parameter.tech",
            ResolutionSource::Unresolved => "",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved (or unresolved) device state name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStateResolution {
    /// Empty when unresolved.
    pub device_state_id: String,
    pub source: ResolutionSource,
}

impl DeviceStateResolution {
    fn new(device_state_id: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            device_state_id: device_state_id.into(),
            source,
        }
    }

    fn unresolved() -> Self {
        Self::new("", ResolutionSource::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        !self.device_state_id.is_empty()
    }
}

/// Technology prefix of a dial string (`PJSIP/2765@from-internal` → `PJSIP`).
pub fn parse_dial_string_tech(dial_string: &str) -> Option<&str> {
    let (tech, _) = dial_string.trim().split_once('/')?;
    let tech = tech.trim();
    if tech.is_empty() {
        None
    } else {
        Some(tech)
    }
}

/// Find the directory entry for an extension.
///
/// Entries are matched by key first; failing that, by a dial string that
/// ends with `/<extension>` or contains `/<extension>@`.
pub fn find_extension<'a>(
    extension: &str,
    extensions: &'a ExtensionsConfig,
) -> Option<&'a ExtensionConfig> {
    if let Some(entry) = extensions.internal.get(extension) {
        return Some(entry);
    }

    let suffix = format!("/{}", extension);
    let infix = format!("/{}@", extension);
    extensions.internal.values().find(|entry| {
        entry
            .dial_string
            .as_deref()
            .map(|ds| ds.ends_with(&suffix) || ds.contains(&infix))
            .unwrap_or(false)
    })
}

/// Resolve the device state name to query for an extension.
///
/// First match wins: explicit id, configured id, configured tech (unless
/// `auto`), tech from the configured dial string, explicit tech.
pub fn resolve_device_state_id(
    extension: &str,
    tech: &str,
    device_state_id: &str,
    extensions: &ExtensionsConfig,
) -> DeviceStateResolution {
    let extension = extension.trim();
    if extension.is_empty() {
        return DeviceStateResolution::unresolved();
    }

    let explicit_id = device_state_id.trim();
    if !explicit_id.is_empty() {
        return DeviceStateResolution::new(explicit_id, ResolutionSource::ParameterDeviceStateId);
    }

    if let Some(entry) = find_extension(extension, extensions) {
        if let Some(id) = non_blank(entry.device_state_id.as_deref()) {
            return DeviceStateResolution::new(id, ResolutionSource::ConfigDeviceStateId);
        }

        if let Some(cfg_tech) = non_blank(entry.device_state_tech.as_deref()) {
            if !cfg_tech.eq_ignore_ascii_case("auto") {
                return DeviceStateResolution::new(
                    device_name(cfg_tech, extension),
                    ResolutionSource::ConfigDeviceStateTech,
                );
            }
        }

        if let Some(dial_tech) = entry.dial_string.as_deref().and_then(parse_dial_string_tech) {
            return DeviceStateResolution::new(
                device_name(dial_tech, extension),
                ResolutionSource::ConfigDialString,
            );
        }
    }

    if let Some(tech) = non_blank(Some(tech)) {
        return DeviceStateResolution::new(device_name(tech, extension), ResolutionSource::ParameterTech);
    }

    DeviceStateResolution::unresolved()
}

/// Uppercased, trimmed state value.
pub fn normalize_state(raw_state: &str) -> String {
    raw_state.trim().to_uppercase()
}

/// Whether a reported device state means the extension can take a call.
///
/// Only `NOT_INUSE` counts; busy, ringing, unavailable, empty and unknown
/// values are all treated as unavailable.
pub fn check_availability(raw_state: &str) -> bool {
    normalize_state(raw_state) == AVAILABLE_STATE
}

fn device_name(tech: &str, extension: &str) -> String {
    format!("{}/{}", tech.to_uppercase(), extension)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ExtensionsConfig {
        let mut extensions = ExtensionsConfig::default();
        extensions
            .internal
            .insert("6000".to_string(), ExtensionConfig::with_dial_string("SIP/6000"));
        extensions.internal.insert(
            "2765".to_string(),
            ExtensionConfig {
                device_state_tech: Some("pjsip".to_string()),
                dial_string: Some("SIP/2765".to_string()),
                ..ExtensionConfig::default()
            },
        );
        extensions.internal.insert(
            "front_desk".to_string(),
            ExtensionConfig::with_dial_string("PJSIP/7001@from-internal"),
        );
        extensions.internal.insert(
            "lobby".to_string(),
            ExtensionConfig::with_dial_string("IAX2/8100"),
        );
        extensions.internal.insert(
            "3000".to_string(),
            ExtensionConfig {
                device_state_id: Some("Custom:agent3000".to_string()),
                device_state_tech: Some("SIP".to_string()),
                ..ExtensionConfig::default()
            },
        );
        extensions.internal.insert(
            "4000".to_string(),
            ExtensionConfig {
                device_state_tech: Some("AUTO".to_string()),
                dial_string: Some("PJSIP/4000".to_string()),
                ..ExtensionConfig::default()
            },
        );
        extensions
    }

    #[test]
    fn test_explicit_id_wins() {
        let r = resolve_device_state_id("3000", "SIP", " Custom/agentA ", &directory());
        assert_eq!(r.device_state_id, "Custom/agentA");
        assert_eq!(r.source, ResolutionSource::ParameterDeviceStateId);
    }

    #[test]
    fn test_configured_id_before_tech() {
        let r = resolve_device_state_id("3000", "", "", &directory());
        assert_eq!(r.device_state_id, "Custom:agent3000");
        assert_eq!(r.source, ResolutionSource::ConfigDeviceStateId);
    }

    #[test]
    fn test_configured_tech_before_dial_string() {
        let r = resolve_device_state_id("2765", "SIP", "", &directory());
        assert_eq!(r.device_state_id, "PJSIP/2765");
        assert_eq!(r.source, ResolutionSource::ConfigDeviceStateTech);
    }

    #[test]
    fn test_auto_tech_falls_through_to_dial_string() {
        let r = resolve_device_state_id("4000", "", "", &directory());
        assert_eq!(r.device_state_id, "PJSIP/4000");
        assert_eq!(r.source, ResolutionSource::ConfigDialString);
    }

    #[test]
    fn test_dial_string_tech() {
        let r = resolve_device_state_id("6000", "PJSIP", "", &directory());
        assert_eq!(r.device_state_id, "SIP/6000");
        assert_eq!(r.source, ResolutionSource::ConfigDialString);
    }

    #[test]
    fn test_fallback_match_by_dial_string() {
        let r = resolve_device_state_id("7001", "", "", &directory());
        assert_eq!(r.device_state_id, "PJSIP/7001");
        assert_eq!(r.source, ResolutionSource::ConfigDialString);

        let r = resolve_device_state_id("8100", "", "", &directory());
        assert_eq!(r.device_state_id, "IAX2/8100");
    }

    #[test]
    fn test_parameter_tech_last() {
        let r = resolve_device_state_id("9999", "pjsip", "", &directory());
        assert_eq!(r.device_state_id, "PJSIP/9999");
        assert_eq!(r.source, ResolutionSource::ParameterTech);
    }

    #[test]
    fn test_unresolved() {
        let r = resolve_device_state_id("9999", "", "", &directory());
        assert!(!r.is_resolved());
        assert_eq!(r.source, ResolutionSource::Unresolved);
        assert_eq!(r.source.as_str(), "");

        let r = resolve_device_state_id("  ", "SIP", "SIP/1", &directory());
        assert!(!r.is_resolved());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let extensions = directory();
        for ext in ["6000", "2765", "7001", "3000", "9999"] {
            let first = resolve_device_state_id(ext, "SIP", "", &extensions);
            for _ in 0..5 {
                assert_eq!(resolve_device_state_id(ext, "SIP", "", &extensions), first);
            }
        }
    }

    #[test]
    fn test_parse_dial_string_tech() {
        assert_eq!(parse_dial_string_tech("PJSIP/2765"), Some("PJSIP"));
        assert_eq!(parse_dial_string_tech("PJSIP/2765@from-internal"), Some("PJSIP"));
        assert_eq!(parse_dial_string_tech(" SIP /6000"), Some("SIP"));
        assert_eq!(parse_dial_string_tech("2765"), None);
        assert_eq!(parse_dial_string_tech("/2765"), None);
        assert_eq!(parse_dial_string_tech(""), None);
    }

    #[test]
    fn test_check_availability() {
        assert!(check_availability("NOT_INUSE"));
        assert!(check_availability("not_inuse"));
        assert!(check_availability(" Not_InUse "));
        for state in ["INUSE", "BUSY", "RINGING", "RINGINUSE", "UNAVAILABLE", "ONHOLD", "", "UNKNOWN"] {
            assert!(!check_availability(state), "{} should be unavailable", state);
        }
    }
}
