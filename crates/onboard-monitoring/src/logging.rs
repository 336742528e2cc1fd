//! Structured logging module using tracing.
//!
//! JSON output is meant for log aggregation, pretty output for local runs.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::MonitoringConfig;

/// Build the filter: `RUST_LOG` when set, else the configured directive
pub fn env_filter(config: &MonitoringConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Initialize structured logging.
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = if config.json_logging {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.with_source_location)
            .with_line_number(config.with_source_location);
        tracing::subscriber::set_global_default(registry.with(json_layer))
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_file(config.with_source_location)
            .with_line_number(config.with_source_location);
        tracing::subscriber::set_global_default(registry.with(fmt_layer))
    };
    installed.context("Failed to set global default subscriber")?;

    info!(
        service_name = %config.service_name,
        log_format = if config.json_logging { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Trait to add log context to results
pub trait LogExt<T, E> {
    /// Log error with additional context before returning
    fn log_err(self, message: &str) -> Result<T, E>;

    /// Log success with additional context before returning
    fn log_ok(self, message: &str) -> Result<T, E>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_err(self, message: &str) -> Result<T, E> {
        if let Err(ref e) = self {
            tracing::error!("{}: {}", message, e);
        }
        self
    }

    fn log_ok(self, message: &str) -> Result<T, E> {
        if self.is_ok() {
            tracing::info!("{}", message);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ext_passes_results_through() {
        let ok: Result<u8, String> = Ok(3);
        let err: Result<u8, String> = Err("boom".to_string());

        assert_eq!(ok.log_ok("fine").log_err("unused"), Ok(3));
        assert_eq!(err.log_err("failed"), Err("boom".to_string()));
    }
}
