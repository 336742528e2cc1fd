use regex::Regex;
use serde_json::Value;
use crate::model::{EntryTemplate, FieldDefinition, FieldNode, OnboardingConfiguration, RuleKind, ValidationRule, walk_fields};
use crate::validation::{ValidationError, error_codes, Validator};

/// Validates the parameters of every field's `validationRules`
pub struct RuleValidator;

impl RuleValidator {
    /// Create a new rule validator
    pub fn new() -> Self {
        RuleValidator
    }
    
    /// Check one rule's parameter; returns a message describing the problem
    fn check_rule(&self, rule: &ValidationRule) -> Option<String> {
        match rule.rule {
            RuleKind::MinLength | RuleKind::MaxLength => match rule.value.as_ref().and_then(Value::as_u64) {
                Some(_) => None,
                None => Some(format!("{} requires a non-negative integer value", rule.rule)),
            },
            RuleKind::Pattern => match rule.value.as_ref().and_then(Value::as_str) {
                Some(pattern) => Regex::new(pattern)
                    .err()
                    .map(|err| format!("pattern '{}' does not compile: {}", pattern, err)),
                None => Some("pattern requires a regular expression string".to_string()),
            },
            RuleKind::DateRange => {
                let bounds = rule.value.as_ref().and_then(Value::as_object);
                match bounds {
                    Some(bounds) if bounds.get("min").map_or(true, Value::is_string)
                        && bounds.get("max").map_or(true, Value::is_string) => None,
                    _ => Some("dateRange requires an object with optional 'min' and 'max' date strings".to_string()),
                }
            }
            RuleKind::Custom => match rule.value.as_ref().and_then(Value::as_str) {
                Some(name) if !name.is_empty() => None,
                _ => Some("custom requires the name of a registered rule".to_string()),
            },
            RuleKind::Required | RuleKind::Email | RuleKind::Number => None,
        }
    }
    
    fn check_length_bounds(&self, rules: &[ValidationRule]) -> Option<String> {
        let bound = |kind: RuleKind| {
            rules
                .iter()
                .find(|r| r.rule == kind)
                .and_then(|r| r.value.as_ref())
                .and_then(Value::as_u64)
        };
        match (bound(RuleKind::MinLength), bound(RuleKind::MaxLength)) {
            (Some(min), Some(max)) if min > max => {
                Some(format!("minLength ({}) is greater than maxLength ({})", min, max))
            }
            _ => None,
        }
    }
}

impl RuleValidator {
    /// Check every rule of one field; `location` is where its rules live
    fn check_field(&self, field: &FieldDefinition, path: &str, location: &str, errors: &mut Vec<ValidationError>) {
        for (rule_idx, rule) in field.validation_rules.iter().enumerate() {
            if let Some(message) = self.check_rule(rule) {
                errors.push(ValidationError {
                    code: error_codes::INVALID_RULE,
                    message: format!("Field '{}': {}", path, message),
                    path: Some(format!("{}.validationRules[{}]", location, rule_idx)),
                });
            }
        }

        if let Some(message) = self.check_length_bounds(&field.validation_rules) {
            errors.push(ValidationError {
                code: error_codes::INVALID_RULE,
                message: format!("Field '{}': {}", path, message),
                path: Some(format!("{}.validationRules", location)),
            });
        }
    }
}

impl Validator for RuleValidator {
    fn validate(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            walk_fields(&step.fields, "", &mut |node: FieldNode<'_>, path: &str, _depth: usize| {
                let location = format!("steps[{}].fields.{}", step_idx, path);
                match node {
                    FieldNode::Leaf(field) | FieldNode::Group { field, .. } => {
                        self.check_field(field, path, &location, &mut errors);
                    }
                    FieldNode::Array { field, entry, .. } => {
                        self.check_field(field, path, &location, &mut errors);
                        // a scalar template has no path of its own; entries live at the array's path
                        if let EntryTemplate::Scalar(template) = entry {
                            self.check_field(template, path, &format!("{}.itemTemplate", location), &mut errors);
                        }
                    }
                }
                true
            });
        }
        
        errors
    }
}
