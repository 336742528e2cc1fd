mod condition;
mod field;
mod step;

pub use condition::{Operator, VisibilityRule};
pub use field::{
    sorted_fields, walk_fields, ArrayConfig, DataType, EntryTemplate, FieldDefinition, FieldKind,
    FieldNode, FieldOption, FieldVisitor, RuleKind, ValidationRule,
};
pub use step::StepDefinition;

use serde::{Deserialize, Serialize};

/// A complete, versioned onboarding configuration.
///
/// The engine only consumes configurations; edits go through
/// [`crate::editor`] which bumps `version` on every structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingConfiguration {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub key: String,

    /// Bumped on every persisted change; sessions pin the version they started on
    #[serde(default = "default_version")]
    pub version: u64,

    #[serde(default)]
    pub target_user_type: String,

    #[serde(default)]
    pub target_org_type: String,

    /// At most one active configuration per (user type, org type); enforced by storage
    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

fn default_version() -> u64 {
    1
}

impl OnboardingConfiguration {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            ..Default::default()
        }
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Steps sorted by `order`, ties in declaration order
    pub fn ordered_steps(&self) -> Vec<&StepDefinition> {
        let mut steps: Vec<&StepDefinition> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }

    pub fn step(&self, key: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Every declared field path (template paths, no entry indices)
    pub fn declared_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for step in &self.steps {
            walk_fields(&step.fields, "", &mut |_node: FieldNode<'_>, path: &str, _depth: usize| {
                paths.push(path.to_string());
                true
            });
        }
        paths
    }
}
