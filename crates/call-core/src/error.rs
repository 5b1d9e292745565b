//! Error types for session and configuration operations.

use thiserror::Error;

/// Errors returned by session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session is stored for the call id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Compare-and-swap kept losing against concurrent writers.
    #[error("session update contention for {call_id} after {attempts} attempts")]
    Contention { call_id: String, attempts: u32 },

    /// Storage or retrieval failure.
    #[error("session store error: {0}")]
    Store(String),
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configuration value failed validation.
    #[error("invalid config value '{field}': {reason}")]
    Invalid { field: String, reason: String },
}
