//! Error types for call-control operations.

use thiserror::Error;

/// Errors that can occur when talking to the call-control platform.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The platform answered with a non-success status.
    #[error("{method} {resource} returned HTTP {status}: {body}")]
    Status {
        method: String,
        resource: String,
        status: u16,
        body: String,
    },

    /// A response was missing a required field.
    #[error("response missing field '{0}'")]
    MissingField(&'static str),

    /// Connection to the platform failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Platform health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
