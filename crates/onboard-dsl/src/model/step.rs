use serde::{Deserialize, Serialize};

use super::{FieldDefinition, VisibilityRule};

/// Definition of a step in an onboarding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Stable identity of the step across edits
    pub key: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps are shown in ascending order, ties in declaration order
    #[serde(default)]
    pub order: i32,

    /// Optional rule deciding whether the step is shown at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_visibility: Option<VisibilityRule>,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl StepDefinition {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_visibility(mut self, rule: VisibilityRule) -> Self {
        self.conditional_visibility = Some(rule);
        self
    }
}
