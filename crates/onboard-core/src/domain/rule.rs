//! Conditional-visibility rule evaluation.
//!
//! Evaluation never fails: a rule that cannot be evaluated counts as
//! satisfied (the guarded step or field stays visible) and the problem is
//! reported once through [`Diagnostics`].

use onboard_dsl::{Operator, VisibilityRule};
use serde_json::Value;
use std::collections::HashSet;

use crate::types::DataSnapshot;

/// Outcome of evaluating a rule without side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The rule was evaluated
    Decided(bool),
    /// The rule could not be evaluated; carries the reason
    Malformed(String),
}

impl Evaluation {
    /// Fail-open interpretation
    pub fn is_visible(&self) -> bool {
        match self {
            Evaluation::Decided(result) => *result,
            Evaluation::Malformed(_) => true,
        }
    }
}

/// A non-blocking problem noticed while interpreting a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// Where the problem was seen, e.g. a rule's `dependsOn`
    pub subject: String,
    /// What went wrong
    pub message: String,
}

/// Collects diagnostics, keeping each distinct one once
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    seen: HashSet<Diagnostic>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic; repeats of an already reported one are dropped
    pub fn report(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            subject: subject.into(),
            message: message.into(),
        };
        if self.seen.insert(diagnostic.clone()) {
            tracing::warn!(
                subject = %diagnostic.subject,
                message = %diagnostic.message,
                "Configuration diagnostic"
            );
            self.entries.push(diagnostic);
        }
    }

    /// All distinct diagnostics in the order first reported
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of distinct diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Evaluate a rule against a snapshot, reporting malformed rules.
pub fn evaluate(rule: &VisibilityRule, context: &DataSnapshot, diagnostics: &mut Diagnostics) -> bool {
    let evaluation = evaluate_rule(rule, context);
    if let Evaluation::Malformed(reason) = &evaluation {
        diagnostics.report(format!("dependsOn '{}'", rule.depends_on), reason.clone());
    }
    evaluation.is_visible()
}

/// Evaluate a rule with no side effects
pub fn evaluate_rule(rule: &VisibilityRule, context: &DataSnapshot) -> Evaluation {
    if rule.depends_on.trim().is_empty() {
        return Evaluation::Malformed("rule has an empty dependsOn".to_string());
    }

    let expected = rule.value.as_ref();
    if rule.operator.takes_value() && expected.is_none() {
        return Evaluation::Malformed(format!("operator '{}' requires a value", rule.operator));
    }

    let actual = context.get(&rule.depends_on);
    let expected = expected.unwrap_or(&Value::Null);

    let result = match &rule.operator {
        Operator::Equals => loosely_equal(actual, expected),
        Operator::NotEquals => !loosely_equal(actual, expected),
        Operator::Contains => contains(actual, expected),
        Operator::GreaterThan => compare(actual, expected, |a, b| a > b),
        Operator::LessThan => compare(actual, expected, |a, b| a < b),
        Operator::IsEmpty => is_empty(actual),
        Operator::IsNotEmpty => !is_empty(actual),
        Operator::Unknown(name) => {
            return Evaluation::Malformed(format!("unknown operator '{}'", name));
        }
    };

    Evaluation::Decided(result)
}

/// Undefined, null, `""` and `[]` are empty
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Primitives compare by their string form, so `"1"` equals `1`.
fn loosely_equal(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual.unwrap_or(&Value::Null), expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (a, b) => match (primitive_string(a), primitive_string(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
    }
}

fn primitive_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            // 1 and 1.0 should agree
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => None,
    }
}

fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| loosely_equal(Some(item), expected)),
        Some(Value::String(s)) => primitive_string(expected).is_some_and(|needle| s.contains(&needle)),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn compare(actual: Option<&Value>, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(as_number), as_number(expected)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}
