//! Per-field validation of `validationRules`.
//!
//! Validation never fails as an operation; a field either passes or yields
//! one [`FieldError`] from the first rule it breaks.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use onboard_dsl::{FieldDefinition, FieldKind, RuleKind, ValidationRule};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::rule::{is_empty, Diagnostics};
use crate::types::DataSnapshot;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rule name reported when an array exceeds `maxItems`
pub const MAX_ITEMS_RULE: &str = "maxItems";

/// A validation failure attached to one materialized field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Materialized path of the failing field
    pub field_name: String,
    /// Name of the rule that failed
    pub rule: String,
    /// Message for the user
    pub message: String,
}

impl FieldError {
    pub fn new(field_name: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field_name, self.rule, self.message)
    }
}

/// A host-supplied check: receives the field value and the whole snapshot
pub type CustomRule = Arc<dyn Fn(&Value, &DataSnapshot) -> bool + Send + Sync>;

/// Named custom rules referenced by `{ rule: custom, value: "<name>" }`
#[derive(Clone, Default)]
pub struct CustomRuleRegistry {
    rules: HashMap<String, CustomRule>,
}

impl CustomRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&Value, &DataSnapshot) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(name.into(), Arc::new(rule));
    }

    pub fn with_rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Value, &DataSnapshot) -> bool + Send + Sync + 'static,
    {
        self.register(name, rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CustomRule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

impl fmt::Debug for CustomRuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("CustomRuleRegistry").field("rules", &names).finish()
    }
}

/// Everything a rule may need besides the value itself
pub struct RuleContext<'a> {
    pub snapshot: &'a DataSnapshot,
    pub custom_rules: &'a CustomRuleRegistry,
    pub diagnostics: &'a mut Diagnostics,
}

/// Whether a value counts as "not answered" for `field`.
///
/// Besides the general emptiness rules, an unchecked checkbox is unanswered.
pub fn is_unanswered(field: &FieldDefinition, value: Option<&Value>) -> bool {
    match (&field.kind, value) {
        (FieldKind::Checkbox, Some(Value::Bool(checked))) => !checked,
        _ => is_empty(value),
    }
}

/// Validate one materialized field.
///
/// The implicit required check (`isRequired`) runs first, then the rules in
/// declared order. An empty optional value skips the remaining rules.
pub fn validate_field(
    field: &FieldDefinition,
    path: &str,
    value: Option<&Value>,
    ctx: &mut RuleContext<'_>,
) -> Option<FieldError> {
    let unanswered = is_unanswered(field, value);

    if field.is_required && unanswered {
        return Some(FieldError::new(path, RuleKind::Required.as_str(), required_message(field, None)));
    }

    if field.kind == FieldKind::Array {
        if let Some(error) = check_array_bounds(field, path, value) {
            return Some(error);
        }
    }

    for rule in &field.validation_rules {
        if rule.rule == RuleKind::Required {
            if unanswered {
                return Some(FieldError::new(path, rule.rule.as_str(), required_message(field, Some(rule))));
            }
            continue;
        }
        if unanswered {
            break;
        }
        let Some(value) = value else { break };
        if let Some(message) = check_rule(rule, value, path, ctx) {
            return Some(FieldError::new(path, rule.rule.as_str(), message));
        }
    }

    None
}

fn required_message(field: &FieldDefinition, rule: Option<&ValidationRule>) -> String {
    rule.and_then(|r| r.message.clone())
        .or_else(|| {
            field
                .validation_rules
                .iter()
                .find(|r| r.rule == RuleKind::Required)
                .and_then(|r| r.message.clone())
        })
        .unwrap_or_else(|| "This field is required".to_string())
}

fn check_array_bounds(field: &FieldDefinition, path: &str, value: Option<&Value>) -> Option<FieldError> {
    let config = field.array_config.unwrap_or_default();
    let len = value.and_then(Value::as_array).map_or(0, Vec::len);

    if let Some(min) = config.min_items {
        if len < min {
            let message = if min == 1 {
                "At least one entry is required".to_string()
            } else {
                format!("At least {} entries are required", min)
            };
            return Some(FieldError::new(path, RuleKind::Required.as_str(), message));
        }
    }
    if let Some(max) = config.max_items {
        if len > max {
            return Some(FieldError::new(
                path,
                MAX_ITEMS_RULE,
                format!("At most {} entries are allowed", max),
            ));
        }
    }
    None
}

/// Apply a single non-required rule to a present value
fn check_rule(rule: &ValidationRule, value: &Value, path: &str, ctx: &mut RuleContext<'_>) -> Option<String> {
    let custom_message = || rule.message.clone();

    match rule.rule {
        RuleKind::Required => None,
        RuleKind::MinLength => {
            let min = rule_usize(rule, path, ctx)?;
            (length_of(value) < min)
                .then(|| custom_message().unwrap_or_else(|| format!("Must be at least {} characters", min)))
        }
        RuleKind::MaxLength => {
            let max = rule_usize(rule, path, ctx)?;
            (length_of(value) > max)
                .then(|| custom_message().unwrap_or_else(|| format!("Must be at most {} characters", max)))
        }
        RuleKind::Pattern => {
            let Some(pattern) = rule.value.as_ref().and_then(Value::as_str) else {
                ctx.diagnostics.report(path, "pattern rule without a regex string");
                return None;
            };
            match Regex::new(pattern) {
                Ok(regex) => (!regex.is_match(&text_of(value)))
                    .then(|| custom_message().unwrap_or_else(|| "Invalid format".to_string())),
                Err(e) => {
                    ctx.diagnostics.report(path, format!("invalid pattern '{}': {}", pattern, e));
                    None
                }
            }
        }
        RuleKind::Email => (!EMAIL_REGEX.is_match(&text_of(value)))
            .then(|| custom_message().unwrap_or_else(|| "Invalid email address".to_string())),
        RuleKind::Number => {
            let numeric = match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false),
                _ => false,
            };
            (!numeric).then(|| custom_message().unwrap_or_else(|| "Must be a number".to_string()))
        }
        RuleKind::DateRange => check_date_range(rule, value, path, ctx),
        RuleKind::Custom => {
            let Some(name) = rule.value.as_ref().and_then(Value::as_str) else {
                ctx.diagnostics.report(path, "custom rule without a name");
                return None;
            };
            match ctx.custom_rules.get(name) {
                Some(check) => (!check(value, ctx.snapshot))
                    .then(|| custom_message().unwrap_or_else(|| "Invalid value".to_string())),
                None => {
                    ctx.diagnostics.report(path, format!("custom rule '{}' is not registered", name));
                    None
                }
            }
        }
    }
}

fn check_date_range(rule: &ValidationRule, value: &Value, path: &str, ctx: &mut RuleContext<'_>) -> Option<String> {
    let Some(date) = value.as_str().and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()) else {
        return Some(rule.message.clone().unwrap_or_else(|| "Invalid date".to_string()));
    };

    let bound = |key: &str| -> Option<Result<NaiveDate, String>> {
        let raw = rule.value.as_ref()?.get(key)?.as_str()?;
        Some(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| raw.to_string()))
    };

    let mut resolve = |key: &str| match bound(key) {
        Some(Ok(date)) => Some(date),
        Some(Err(raw)) => {
            ctx.diagnostics.report(path, format!("dateRange {} '{}' is not a date", key, raw));
            None
        }
        None => None,
    };
    let min = resolve("min");
    let max = resolve("max");

    if let Some(min) = min {
        if date < min {
            return Some(rule.message.clone().unwrap_or_else(|| format!("Date must be on or after {}", min)));
        }
    }
    if let Some(max) = max {
        if date > max {
            return Some(rule.message.clone().unwrap_or_else(|| format!("Date must be on or before {}", max)));
        }
    }
    None
}

fn rule_usize(rule: &ValidationRule, path: &str, ctx: &mut RuleContext<'_>) -> Option<usize> {
    let bound = rule.value.as_ref().and_then(Value::as_u64).map(|n| n as usize);
    if bound.is_none() {
        ctx.diagnostics.report(path, format!("{} rule without a non-negative integer", rule.rule));
    }
    bound
}

/// Characters of a string, entries of an array, characters of anything else
fn length_of(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        other => text_of(other).chars().count(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(field: &FieldDefinition, value: Value) -> Option<FieldError> {
        run_with(field, value, &CustomRuleRegistry::new(), &mut Diagnostics::new())
    }

    fn run_with(
        field: &FieldDefinition,
        value: Value,
        custom_rules: &CustomRuleRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Option<FieldError> {
        let snapshot = DataSnapshot::new();
        let mut ctx = RuleContext {
            snapshot: &snapshot,
            custom_rules,
            diagnostics,
        };
        let value = (!value.is_null()).then_some(value);
        validate_field(field, &field.field_name, value.as_ref(), &mut ctx)
    }

    #[test]
    fn test_required_then_min_length() {
        let field = FieldDefinition::new("name", FieldKind::Text)
            .required()
            .with_rule(ValidationRule::new(RuleKind::MinLength, Some(json!(2))));

        let missing = run(&field, Value::Null).unwrap();
        assert_eq!(missing.rule, "required");

        let short = run(&field, json!("A")).unwrap();
        assert_eq!(short.rule, "minLength");
        assert_eq!(short.field_name, "name");

        assert_eq!(run(&field, json!("Al")), None);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let field = FieldDefinition::new("code", FieldKind::Text)
            .with_rule(ValidationRule::new(RuleKind::Pattern, Some(json!("^[A-Z]+$"))).with_message("Uppercase only"))
            .with_rule(ValidationRule::new(RuleKind::MinLength, Some(json!(5))));

        let error = run(&field, json!("ab")).unwrap();
        assert_eq!(error.rule, "pattern");
        assert_eq!(error.message, "Uppercase only");

        assert_eq!(run(&field, json!("AB")).unwrap().rule, "minLength");
    }

    #[test]
    fn test_empty_optional_value_skips_rules() {
        let field = FieldDefinition::new("email", FieldKind::Email)
            .with_rule(ValidationRule::new(RuleKind::Email, None));

        assert_eq!(run(&field, json!("")), None);
        assert_eq!(run(&field, Value::Null), None);
        assert_eq!(run(&field, json!("nobody")).unwrap().rule, "email");
        assert_eq!(run(&field, json!("a@b.io")), None);
    }

    #[test]
    fn test_explicit_required_rule_uses_its_message() {
        let field = FieldDefinition::new("terms", FieldKind::Checkbox)
            .with_rule(ValidationRule::new(RuleKind::Required, None).with_message("Please accept"));

        let error = run(&field, json!(false)).unwrap();
        assert_eq!(error.message, "Please accept");
        assert_eq!(run(&field, json!(true)), None);
    }

    #[test]
    fn test_number_rule() {
        let field = FieldDefinition::new("income", FieldKind::Number)
            .with_rule(ValidationRule::new(RuleKind::Number, None));

        assert_eq!(run(&field, json!(12.5)), None);
        assert_eq!(run(&field, json!("42")), None);
        assert_eq!(run(&field, json!("forty")).unwrap().rule, "number");
    }

    #[test]
    fn test_date_range() {
        let field = FieldDefinition::new("birthDate", FieldKind::Date).with_rule(ValidationRule::new(
            RuleKind::DateRange,
            Some(json!({ "min": "1900-01-01", "max": "2010-12-31" })),
        ));

        assert_eq!(run(&field, json!("1985-06-15")), None);
        assert_eq!(run(&field, json!("1899-12-31")).unwrap().rule, "dateRange");
        assert_eq!(run(&field, json!("2011-01-01")).unwrap().rule, "dateRange");
        assert_eq!(run(&field, json!("15/06/1985")).unwrap().message, "Invalid date");
    }

    #[test]
    fn test_array_bounds() {
        let field = FieldDefinition::new("employers", FieldKind::Array)
            .with_children(vec![FieldDefinition::new("name", FieldKind::Text)])
            .with_array_config(Some(1), Some(2));

        let error = run(&field, json!([])).unwrap();
        assert_eq!(error.rule, "required");
        assert_eq!(error.message, "At least one entry is required");

        assert_eq!(run(&field, json!([{ "name": "" }])), None);
        assert_eq!(run(&field, json!([{}, {}, {}])).unwrap().rule, MAX_ITEMS_RULE);
    }

    #[test]
    fn test_custom_rules() {
        let registry = CustomRuleRegistry::new()
            .with_rule("even", |value: &Value, _: &DataSnapshot| value.as_i64().map_or(false, |n| n % 2 == 0));
        let field = FieldDefinition::new("pairs", FieldKind::Number)
            .with_rule(ValidationRule::new(RuleKind::Custom, Some(json!("even"))));
        let mut diagnostics = Diagnostics::new();

        assert_eq!(run_with(&field, json!(4), &registry, &mut diagnostics), None);
        assert_eq!(
            run_with(&field, json!(3), &registry, &mut diagnostics).unwrap().rule,
            "custom"
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unregistered_custom_rule_passes_with_diagnostic() {
        let field = FieldDefinition::new("passport", FieldKind::Text)
            .with_rule(ValidationRule::new(RuleKind::Custom, Some(json!("passportChecksum"))));
        let mut diagnostics = Diagnostics::new();

        assert_eq!(run_with(&field, json!("X123"), &CustomRuleRegistry::new(), &mut diagnostics), None);
        assert_eq!(diagnostics.len(), 1);
    }
}
