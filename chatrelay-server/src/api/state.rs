//! Shared server state
//!
//! The relay is stateless per request; the only shared piece is the
//! upstream configuration snapshot taken at startup. An unconfigured
//! server still starts and answers every chat request with a
//! structured configuration error.

use chatrelay_core::config::UpstreamConfig;

#[derive(Clone, Default)]
pub struct AppState {
    pub config: Option<UpstreamConfig>,
}

impl AppState {
    /// Snapshot the upstream configuration from the environment.
    pub fn from_env() -> Self {
        match UpstreamConfig::from_env() {
            Ok(config) => Self {
                config: Some(config),
            },
            Err(e) => {
                tracing::warn!("Upstream not configured: {}", e);
                Self { config: None }
            }
        }
    }

    /// State with a known configuration, used by tests.
    pub fn with_config(config: UpstreamConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}
