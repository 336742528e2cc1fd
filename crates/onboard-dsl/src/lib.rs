//! # Onboard DSL
//!
//! Declarative model for multi-step onboarding forms. A configuration is an
//! ordered list of steps, each an ordered list of fields; fields carry
//! validation rules, a single-condition visibility rule, and may nest
//! (groups and repeatable arrays). This crate parses, validates and edits
//! that model; `onboard-core` interprets it.
//!
//! ## Features
//!
//! * JSON and YAML configuration documents
//! * Recursive field trees with a generic visitor walk
//! * Eager validation with aggregated errors: duplicate names, dangling or
//!   cyclic `dependsOn` references, unusable rule parameters
//! * Editor draft reducer that bumps the configuration version on
//!   structural changes
//!
//! ## Example
//!
//! ```
//! use onboard_dsl::{parse_and_validate_configuration, ConfigFormat};
//!
//! let json = r#"{
//!   "id": "visa-2024",
//!   "name": "Visa application",
//!   "steps": [
//!     { "key": "history", "title": "History", "order": 0,
//!       "fields": [{ "fieldName": "hasPreviousVisas", "kind": "checkbox" }] },
//!     { "key": "visas", "title": "Previous visas", "order": 1,
//!       "conditionalVisibility": { "dependsOn": "hasPreviousVisas", "operator": "equals", "value": true },
//!       "fields": [{ "fieldName": "visaCountry", "kind": "text", "isRequired": true }] }
//!   ]
//! }"#;
//!
//! let result = parse_and_validate_configuration(json, ConfigFormat::Json);
//! assert!(result.is_ok());
//! ```

mod error;
mod parser;

pub mod editor;
pub mod model;
pub mod utils;
pub mod validation;

pub use error::DslError;
pub use model::{
    ArrayConfig, DataType, EntryTemplate, FieldDefinition, FieldKind, FieldNode, FieldOption,
    FieldVisitor, OnboardingConfiguration, Operator, RuleKind, StepDefinition, ValidationRule,
    VisibilityRule,
};
pub use parser::{parse_configuration, ConfigFormat};
pub use validation::{validate_configuration, ValidationError};

/// Parse and validate an onboarding configuration document.
///
/// # Errors
///
/// * Invalid JSON / YAML syntax or shape
/// * Validation errors, aggregated into one [`DslError`]
///
/// ```
/// use onboard_dsl::{parse_and_validate_configuration, ConfigFormat};
///
/// // "ghost" is not declared anywhere
/// let json = r#"{
///   "id": "broken",
///   "steps": [{ "key": "one", "fields": [
///     { "fieldName": "name", "kind": "text",
///       "conditionalVisibility": { "dependsOn": "ghost", "operator": "isNotEmpty" } }
///   ]}]
/// }"#;
///
/// let err = parse_and_validate_configuration(json, ConfigFormat::Json).unwrap_err();
/// assert!(err.error_code().contains("INVALID_REFERENCE"));
/// ```
pub fn parse_and_validate_configuration(
    input: &str,
    format: ConfigFormat,
) -> Result<OnboardingConfiguration, DslError> {
    let configuration = parser::parse_configuration(input, format)?;

    validation::validate_configuration(&configuration)?;

    Ok(configuration)
}

/// Returns a version string for the crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
