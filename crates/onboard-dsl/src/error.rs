use thiserror::Error;
use crate::validation::ValidationError;
use std::fmt;

/// All possible errors that can occur while loading a configuration
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    
    /// Errors that occur during JSON processing
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),
    
    /// A single validation error
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),
    
    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<ValidationError>),
    
    /// Unrecognized document format
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
    
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl DslError {
    /// Create a DslError from a vector of validation errors
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        let mut errors = errors.into_iter();
        match (errors.next(), errors.next()) {
            (None, _) => DslError::InternalError("Called from_validation_errors with empty vector".to_string()),
            (Some(only), None) => DslError::ValidationError(only),
            (Some(first), Some(second)) => {
                let mut all = vec![first, second];
                all.extend(errors);
                DslError::MultipleValidationErrors(all)
            }
        }
    }
    
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::YamlError(_) => "ERR_DSL_YAML_PARSE",
            DslError::JsonError(_) => "ERR_DSL_JSON_PARSE",
            DslError::ValidationError(err) => err.code,
            DslError::MultipleValidationErrors(_) => "ERR_DSL_VALIDATION_MULTIPLE",
            DslError::UnsupportedFormat(_) => "ERR_DSL_UNSUPPORTED_FORMAT",
            DslError::InternalError(_) => "ERR_DSL_INTERNAL",
        }
    }

    /// The individual validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            DslError::ValidationError(err) => std::slice::from_ref(err),
            DslError::MultipleValidationErrors(errors) => errors,
            _ => &[],
        }
    }

    /// Whether any carried validation error has the given code
    pub fn has_code(&self, code: &str) -> bool {
        self.error_code() == code || self.validation_errors().iter().any(|e| e.code == code)
    }
}
