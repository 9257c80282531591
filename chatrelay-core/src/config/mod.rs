//! Upstream connection configuration
//!
//! The relay reads its upstream parameters from the environment. A
//! missing value is an operator error, not a code fault: it is checked
//! before any upstream call and surfaced as a structured 5xx response.

pub mod error;

pub use error::{ConfigError, ConfigResult, MISSING_CONFIG_HINT};

/// Environment variable holding the Azure OpenAI resource endpoint
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
/// Environment variable holding the API credential
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
/// Environment variable holding the chat deployment identifier
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_CHAT_DEPLOYMENT";
/// Environment variable overriding the API version
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// API version used when the environment does not override it
pub const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Connection parameters for the upstream completion endpoint
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base resource URL, e.g. `https://example.openai.azure.com`
    pub endpoint: String,

    /// API key sent in the `api-key` header
    pub api_key: String,

    /// Deployment (model) identifier
    pub deployment: String,

    /// API version query parameter
    pub api_version: String,
}

impl UpstreamConfig {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load the configuration through an arbitrary lookup function.
    ///
    /// Empty values count as missing, matching how an unset deployment
    /// slot variable usually arrives as an empty string.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str| -> ConfigResult<String> {
            match lookup(var) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::EnvVarNotFound {
                    var: var.to_string(),
                }),
            }
        };

        let endpoint = required(ENV_ENDPOINT)?;
        let api_key = required(ENV_API_KEY)?;
        let deployment = required(ENV_DEPLOYMENT)?;
        let api_version = lookup(ENV_API_VERSION)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            endpoint,
            api_key,
            deployment,
            api_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_complete_configuration() {
        let vars = env_map(&[
            (ENV_ENDPOINT, "https://example.openai.azure.com"),
            (ENV_API_KEY, "secret"),
            (ENV_DEPLOYMENT, "gpt-4o"),
        ]);

        let config = UpstreamConfig::from_lookup(|var| vars.get(var).cloned()).unwrap();
        assert_eq!(config.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.deployment, "gpt-4o");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_api_version_override() {
        let vars = env_map(&[
            (ENV_ENDPOINT, "https://example.openai.azure.com"),
            (ENV_API_KEY, "secret"),
            (ENV_DEPLOYMENT, "gpt-4o"),
            (ENV_API_VERSION, "2025-01-01"),
        ]);

        let config = UpstreamConfig::from_lookup(|var| vars.get(var).cloned()).unwrap();
        assert_eq!(config.api_version, "2025-01-01");
    }

    #[test]
    fn test_each_required_variable_is_checked() {
        for missing in [ENV_ENDPOINT, ENV_API_KEY, ENV_DEPLOYMENT] {
            let vars = env_map(&[
                (ENV_ENDPOINT, "https://example.openai.azure.com"),
                (ENV_API_KEY, "secret"),
                (ENV_DEPLOYMENT, "gpt-4o"),
            ]);

            let result =
                UpstreamConfig::from_lookup(|var| if var == missing { None } else { vars.get(var).cloned() });

            match result {
                Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, missing),
                other => panic!("expected missing '{}', got {:?}", missing, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let vars = env_map(&[
            (ENV_ENDPOINT, ""),
            (ENV_API_KEY, "secret"),
            (ENV_DEPLOYMENT, "gpt-4o"),
        ]);

        let result = UpstreamConfig::from_lookup(|var| vars.get(var).cloned());
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarNotFound { var }) if var == ENV_ENDPOINT
        ));
    }
}
