use std::path::Path;

use crate::error::DslError;
use crate::model::OnboardingConfiguration;

/// Serialization formats accepted for persisted configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, DslError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            other => Err(DslError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Parse a configuration document into an [`OnboardingConfiguration`].
///
/// Only the shape is checked here; references, uniqueness and rule
/// parameters are checked by the validation module.
pub fn parse_configuration(input: &str, format: ConfigFormat) -> Result<OnboardingConfiguration, DslError> {
    let configuration: OnboardingConfiguration = match format {
        ConfigFormat::Json => serde_json::from_str(input)?,
        ConfigFormat::Yaml => serde_yaml::from_str(input)?,
    };
    
    tracing::trace!(
        configuration_id = %configuration.id,
        version = configuration.version,
        steps = configuration.steps.len(),
        "Parsed onboarding configuration"
    );
    
    Ok(configuration)
}
