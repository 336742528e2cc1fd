use std::fmt;
use std::error::Error;
use crate::model::OnboardingConfiguration;
use crate::error::DslError;

mod reference;
mod rules;
mod structure;

/// Represents a validation error found in a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error code (should be a constant identifier)
    pub code: &'static str,
    
    /// Human-readable error message
    pub message: String,
    
    /// Optional path to the location of the error (e.g., "steps[0].fields[2]")
    pub path: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// `dependsOn` names a field that is not declared
    pub const INVALID_REFERENCE: &str = "ERR_DSL_VALIDATION_INVALID_REFERENCE";
    
    /// Duplicate field name within a scope, or duplicate step key
    pub const DUPLICATE_ID: &str = "ERR_DSL_VALIDATION_DUPLICATE_ID";
    
    /// Cyclic `dependsOn` chain
    pub const CIRCULAR_DEPENDENCY: &str = "ERR_DSL_VALIDATION_CIRCULAR_DEPENDENCY";
    
    /// Validation rule with a missing or unusable parameter
    pub const INVALID_RULE: &str = "ERR_DSL_VALIDATION_INVALID_RULE";
    
    /// Malformed field name
    pub const INVALID_FIELD_NAME: &str = "ERR_DSL_VALIDATION_INVALID_FIELD_NAME";
    
    /// Missing required field
    pub const MISSING_REQUIRED_FIELD: &str = "ERR_DSL_VALIDATION_MISSING_REQUIRED_FIELD";
    
    /// Array or group without sub-fields, or inconsistent entry bounds
    pub const INVALID_CONTAINER: &str = "ERR_DSL_VALIDATION_INVALID_CONTAINER";
}

/// A trait for validators that check specific aspects of a configuration
pub trait Validator {
    /// Validate the configuration and return a list of validation errors (if any)
    fn validate(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError>;
}

/// Validate a configuration, aggregating every problem into one error
pub fn validate_configuration(configuration: &OnboardingConfiguration) -> Result<(), DslError> {
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(structure::StructureValidator::new()),
        Box::new(reference::ReferenceValidator::new()),
        Box::new(rules::RuleValidator::new()),
    ];
    
    let mut errors = Vec::new();
    
    for validator in validators {
        errors.extend(validator.validate(configuration));
    }
    
    if !errors.is_empty() {
        tracing::debug!(
            configuration_id = %configuration.id,
            error_count = errors.len(),
            "Configuration failed validation"
        );
        return Err(DslError::from_validation_errors(errors));
    }
    
    Ok(())
}
