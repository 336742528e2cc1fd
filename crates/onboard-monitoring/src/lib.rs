//! Logging setup shared by the onboarding crates and binaries.

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod logging;

pub use logging::{init_logging, LogExt};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,onboard_core=debug"); `RUST_LOG` wins when set
    pub log_filter: String,
    /// JSON lines instead of human-readable output
    pub json_logging: bool,
    /// Include source file and line in every event
    pub with_source_location: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "onboard".to_string(),
            log_filter: "info".to_string(),
            json_logging: false,
            with_source_location: false,
        }
    }
}

impl MonitoringConfig {
    /// Default settings for a named service
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }
}

/// Initialize logging
pub fn init(config: MonitoringConfig) -> anyhow::Result<()> {
    init_logging(&config)?;
    info!(service_name = %config.service_name, "Monitoring initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "onboard");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logging);
    }

    #[test]
    fn test_for_service() {
        let config = MonitoringConfig::for_service("onboard-check");
        assert_eq!(config.service_name, "onboard-check");
        assert_eq!(config.log_filter, "info");
    }
}
