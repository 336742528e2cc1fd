//! Engine configuration
//!
//! Loaded from an optional JSON or YAML file, then overridden by `ONBOARD_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::error::CoreError;

/// Runtime settings for form sessions and the checker binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest allowed field nesting (groups and arrays); deeper
    /// configurations are refused at session start
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Trim surrounding whitespace from text values on `set_value`
    #[serde(default = "default_trim_text_values")]
    pub trim_text_values: bool,

    /// Log filter directive, e.g. `info` or `onboard_core=debug`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logging: bool,
}

fn default_max_nesting_depth() -> usize {
    8
}

fn default_trim_text_values() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: default_max_nesting_depth(),
            trim_text_values: default_trim_text_values(),
            log_filter: default_log_filter(),
            json_logging: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and an optional file
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Read a JSON or YAML file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| CoreError::ConfigurationError(format!("{}: {}", path.display(), e)))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| CoreError::ConfigurationError(format!("{}: {}", path.display(), e)))?,
        };
        info!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Override settings from `ONBOARD_*` variables found through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(depth) = lookup("ONBOARD_MAX_NESTING_DEPTH") {
            if let Ok(depth) = depth.parse::<usize>() {
                self.max_nesting_depth = depth;
            } else {
                warn!("Invalid ONBOARD_MAX_NESTING_DEPTH value: {}", depth);
            }
        }

        if let Some(trim) = lookup("ONBOARD_TRIM_TEXT_VALUES") {
            match parse_flag(&trim) {
                Some(trim) => self.trim_text_values = trim,
                None => warn!("Invalid ONBOARD_TRIM_TEXT_VALUES value: {}", trim),
            }
        }

        if let Some(filter) = lookup("ONBOARD_LOG") {
            self.log_filter = filter;
        }

        if let Some(json) = lookup("ONBOARD_LOG_JSON") {
            match parse_flag(&json) {
                Some(json) => self.json_logging = json,
                None => warn!("Invalid ONBOARD_LOG_JSON value: {}", json),
            }
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_nesting_depth, 8);
        assert!(config.trim_text_values);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("ONBOARD_MAX_NESTING_DEPTH", "3"),
            ("ONBOARD_TRIM_TEXT_VALUES", "no"),
            ("ONBOARD_LOG", "onboard_core=debug"),
            ("ONBOARD_LOG_JSON", "1"),
        ]));

        assert_eq!(config.max_nesting_depth, 3);
        assert!(!config.trim_text_values);
        assert_eq!(config.log_filter, "onboard_core=debug");
        assert!(config.json_logging);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("ONBOARD_MAX_NESTING_DEPTH", "deep"),
            ("ONBOARD_LOG_JSON", "maybe"),
        ]));

        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "max_nesting_depth: 4\njson_logging: true").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();

        assert_eq!(config.max_nesting_depth, 4);
        assert!(config.json_logging);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_malformed_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ \"max_nesting_depth\": ").unwrap();

        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "ERR_CORE_CONFIG");
    }
}
