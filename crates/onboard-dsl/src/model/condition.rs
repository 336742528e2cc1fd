use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a visibility rule.
///
/// Unknown operator names are preserved as [`Operator::Unknown`] instead of
/// failing deserialization, so a configuration authored against a newer
/// editor still loads and the rule fails open at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
            Operator::Unknown(name) => name,
        }
    }

    /// Whether the operator compares against the rule's `value`.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => Operator::Equals,
            "notEquals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "greaterThan" => Operator::GreaterThan,
            "lessThan" => Operator::LessThan,
            "isEmpty" => Operator::IsEmpty,
            "isNotEmpty" => Operator::IsNotEmpty,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Operator::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `dependsOn` / `operator` / `value` visibility expression.
///
/// Only one condition per rule; there is no AND/OR composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
    /// Materialized field path read from the data snapshot
    #[serde(default)]
    pub depends_on: String,

    pub operator: Operator,

    /// Comparison operand; ignored by `isEmpty` / `isNotEmpty`.
    /// An explicit `null` is `Some(Value::Null)`, an absent key is `None`.
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Only called when the key is present, so `null` stays a comparable value
fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl VisibilityRule {
    pub fn new(
        depends_on: impl Into<String>,
        operator: impl Into<Operator>,
        value: Option<serde_json::Value>,
    ) -> Self {
        Self {
            depends_on: depends_on.into(),
            operator: operator.into(),
            value,
        }
    }
}
