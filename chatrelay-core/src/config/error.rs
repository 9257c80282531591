//! Configuration error types

use thiserror::Error;

/// Human-facing hint returned to callers when the upstream connection
/// parameters are absent. Kept as a single aggregate message so the
/// operator sees every required variable at once.
pub const MISSING_CONFIG_HINT: &str = "Missing Azure OpenAI configuration. \
    Set AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, and AZURE_OPENAI_CHAT_DEPLOYMENT.";

/// Main configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable '{var}' not found")]
    EnvVarNotFound { var: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
