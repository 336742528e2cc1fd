use std::collections::HashSet;
use crate::model::{EntryTemplate, FieldDefinition, FieldKind, OnboardingConfiguration};
use crate::utils::path::is_valid_field_name;
use crate::validation::{ValidationError, error_codes, Validator};

/// Validates identity and shape: non-empty ids, unique step keys, unique
/// field names per scope, and well-formed containers
pub struct StructureValidator;

impl StructureValidator {
    /// Create a new structure validator
    pub fn new() -> Self {
        StructureValidator
    }
    
    /// Step keys must be present and unique within the configuration
    fn validate_step_keys(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut keys = HashSet::with_capacity(configuration.steps.len());
        let mut duplicates = Vec::new();
        
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            if step.key.trim().is_empty() {
                errors.push(ValidationError {
                    code: error_codes::MISSING_REQUIRED_FIELD,
                    message: "Step is missing its key".to_string(),
                    path: Some(format!("steps[{}].key", step_idx)),
                });
            } else if !keys.insert(step.key.as_str()) && !duplicates.contains(&step.key.as_str()) {
                duplicates.push(step.key.as_str());
            }
        }
        
        for duplicate in duplicates {
            errors.push(ValidationError {
                code: error_codes::DUPLICATE_ID,
                message: format!("Duplicate step key: '{}' - step keys must be unique within a configuration", duplicate),
                path: Some("steps".to_string()),
            });
        }
        
        errors
    }
    
    /// Top-level field names share one scope across every step, since they
    /// address the same data snapshot
    fn validate_top_level_names(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            for (field_idx, field) in step.fields.iter().enumerate() {
                let name = field.field_name.as_str();
                if !name.is_empty() && !seen.insert(name) && reported.insert(name) {
                    errors.push(ValidationError {
                        code: error_codes::DUPLICATE_ID,
                        message: format!(
                            "Duplicate field name: '{}' - field names must be unique across all steps",
                            name
                        ),
                        path: Some(format!("steps[{}].fields[{}]", step_idx, field_idx)),
                    });
                }
            }
        }
        
        errors
    }
    
    /// Check a list of sibling fields and recurse into containers
    fn validate_fields(&self, fields: &[FieldDefinition], path: &str, check_duplicates: bool) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::with_capacity(fields.len());
        
        for (idx, field) in fields.iter().enumerate() {
            let field_path = format!("{}[{}]", path, idx);
            
            if field.field_name.is_empty() {
                errors.push(ValidationError {
                    code: error_codes::MISSING_REQUIRED_FIELD,
                    message: "Field is missing its fieldName".to_string(),
                    path: Some(field_path.clone()),
                });
            } else if !is_valid_field_name(&field.field_name) {
                errors.push(ValidationError {
                    code: error_codes::INVALID_FIELD_NAME,
                    message: format!(
                        "Invalid field name '{}'. Names start with a letter or '_' and contain only letters, digits, '_' and '-'",
                        field.field_name
                    ),
                    path: Some(format!("{}.fieldName", field_path)),
                });
            } else if check_duplicates && !seen.insert(field.field_name.as_str()) {
                errors.push(ValidationError {
                    code: error_codes::DUPLICATE_ID,
                    message: format!(
                        "Duplicate field name: '{}' - sibling field names must be unique",
                        field.field_name
                    ),
                    path: Some(field_path.clone()),
                });
            }
            
            errors.extend(self.validate_container(field, &field_path));
        }
        
        errors
    }
    
    fn validate_container(&self, field: &FieldDefinition, path: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        
        match field.kind {
            FieldKind::Group => {
                if field.children.is_empty() {
                    errors.push(ValidationError {
                        code: error_codes::INVALID_CONTAINER,
                        message: format!("Group '{}' has no children", field.field_name),
                        path: Some(format!("{}.children", path)),
                    });
                }
                errors.extend(self.validate_fields(&field.children, &format!("{}.children", path), true));
            }
            FieldKind::Array => {
                match field.entry_template() {
                    EntryTemplate::Fields(children) if children.is_empty() => {
                        errors.push(ValidationError {
                            code: error_codes::INVALID_CONTAINER,
                            message: format!(
                                "Array '{}' needs either children or an itemTemplate",
                                field.field_name
                            ),
                            path: Some(path.to_string()),
                        });
                    }
                    EntryTemplate::Fields(children) => {
                        let child_path = if field.children.is_empty() {
                            format!("{}.itemTemplate.children", path)
                        } else {
                            format!("{}.children", path)
                        };
                        errors.extend(self.validate_fields(children, &child_path, true));
                    }
                    EntryTemplate::Scalar(template) => {
                        errors.extend(self.validate_container(template, &format!("{}.itemTemplate", path)));
                    }
                }
                
                if let Some(config) = field.array_config {
                    if let (Some(min), Some(max)) = (config.min_items, config.max_items) {
                        if min > max {
                            errors.push(ValidationError {
                                code: error_codes::INVALID_CONTAINER,
                                message: format!(
                                    "Array '{}' has minItems ({}) greater than maxItems ({})",
                                    field.field_name, min, max
                                ),
                                path: Some(format!("{}.arrayConfig", path)),
                            });
                        }
                    }
                }
            }
            _ => {}
        }
        
        errors
    }
}

impl Validator for StructureValidator {
    fn validate(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        
        if configuration.id.trim().is_empty() {
            errors.push(ValidationError {
                code: error_codes::MISSING_REQUIRED_FIELD,
                message: "Configuration is missing its id".to_string(),
                path: Some("id".to_string()),
            });
        }
        
        errors.extend(self.validate_step_keys(configuration));
        errors.extend(self.validate_top_level_names(configuration));
        
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            // top-level duplicates are reported across steps above
            errors.extend(self.validate_fields(&step.fields, &format!("steps[{}].fields", step_idx), false));
        }
        
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepDefinition;
    
    fn config_with(steps: Vec<StepDefinition>) -> OnboardingConfiguration {
        let mut config = OnboardingConfiguration::new("cfg-1", "Test");
        config.steps = steps;
        config
    }
    
    #[test]
    fn test_duplicate_step_keys() {
        let config = config_with(vec![
            StepDefinition::new("personal", "Personal"),
            StepDefinition::new("personal", "Again"),
        ]);
        
        let errors = StructureValidator::new().validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, error_codes::DUPLICATE_ID);
        assert!(errors[0].message.contains("personal"));
    }
    
    #[test]
    fn test_duplicate_field_names_across_steps() {
        let config = config_with(vec![
            StepDefinition::new("one", "One").with_field(FieldDefinition::new("name", FieldKind::Text)),
            StepDefinition::new("two", "Two").with_field(FieldDefinition::new("name", FieldKind::Text)),
        ]);
        
        let errors = StructureValidator::new().validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some("steps[1].fields[0]"));
    }
    
    #[test]
    fn test_same_child_name_in_different_scopes_is_allowed() {
        let config = config_with(vec![StepDefinition::new("one", "One")
            .with_field(
                FieldDefinition::new("employers", FieldKind::Array)
                    .with_children(vec![FieldDefinition::new("name", FieldKind::Text)]),
            )
            .with_field(
                FieldDefinition::new("schools", FieldKind::Array)
                    .with_children(vec![FieldDefinition::new("name", FieldKind::Text)]),
            )]);
        
        assert!(StructureValidator::new().validate(&config).is_empty());
    }
    
    #[test]
    fn test_duplicate_child_names() {
        let config = config_with(vec![StepDefinition::new("one", "One").with_field(
            FieldDefinition::new("address", FieldKind::Group).with_children(vec![
                FieldDefinition::new("city", FieldKind::Text),
                FieldDefinition::new("city", FieldKind::Text),
            ]),
        )]);
        
        let errors = StructureValidator::new().validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some("steps[0].fields[0].children[1]"));
    }
    
    #[test]
    fn test_empty_array_and_bad_bounds() {
        let config = config_with(vec![StepDefinition::new("one", "One").with_field(
            FieldDefinition::new("employers", FieldKind::Array).with_array_config(Some(3), Some(1)),
        )]);
        
        let errors = StructureValidator::new().validate(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == error_codes::INVALID_CONTAINER));
    }
    
    #[test]
    fn test_dotted_field_name_is_rejected() {
        let config = config_with(vec![StepDefinition::new("one", "One")
            .with_field(FieldDefinition::new("address.city", FieldKind::Text))]);
        
        let errors = StructureValidator::new().validate(&config);
        assert_eq!(errors[0].code, error_codes::INVALID_FIELD_NAME);
    }
}
