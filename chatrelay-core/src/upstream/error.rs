//! Upstream error types and handling

use thiserror::Error;

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors that can occur when calling the upstream completion endpoint
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream answered with a non-success status
    #[error("Upstream returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response or stream parsing error
    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    /// Timeout occurred
    #[error("Upstream request timed out")]
    Timeout,

    /// Client construction or configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            UpstreamError::Parse(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Parse(err.to_string())
    }
}
