//! What the host renderer needs for each visible field, and a registry that
//! maps field kinds to host renderers.

use onboard_dsl::{
    model::walk_fields, EntryTemplate, FieldKind, FieldNode, FieldOption, OnboardingConfiguration,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Add/remove affordances for an array field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayControls {
    pub len: usize,
    pub can_add: bool,
    pub can_remove: bool,
}

/// Binding between one materialized, visible field and its widget.
///
/// Values flow back through `FormSession::set_value(field_name, value)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetBinding {
    /// Materialized path, e.g. `employers.2.name`
    pub field_name: String,
    pub label: String,
    pub kind: FieldKind,
    /// Stored value, or the kind's empty value when nothing is stored yet
    pub current_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Present for array fields only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controls: Option<ArrayControls>,
}

/// Maps field kinds to host renderers, with an optional fallback for kinds
/// nobody registered.
pub struct WidgetRegistry<R> {
    renderers: HashMap<FieldKind, R>,
    fallback: Option<R>,
}

impl<R> Default for WidgetRegistry<R> {
    fn default() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<R> WidgetRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for a kind, replacing any previous one
    pub fn register(&mut self, kind: impl Into<FieldKind>, renderer: R) -> &mut Self {
        self.renderers.insert(kind.into(), renderer);
        self
    }

    pub fn with_fallback(mut self, renderer: R) -> Self {
        self.fallback = Some(renderer);
        self
    }

    /// The renderer for `kind`, else the fallback
    pub fn resolve(&self, kind: &FieldKind) -> Option<&R> {
        self.renderers.get(kind).or(self.fallback.as_ref())
    }

    /// Pair each binding with its renderer; bindings without one are skipped
    /// with a warning.
    pub fn bind<'a>(&'a self, bindings: &'a [WidgetBinding]) -> Vec<(&'a WidgetBinding, &'a R)> {
        bindings
            .iter()
            .filter_map(|binding| match self.resolve(&binding.kind) {
                Some(renderer) => Some((binding, renderer)),
                None => {
                    tracing::warn!(field = %binding.field_name, kind = %binding.kind, "No renderer for field kind");
                    None
                }
            })
            .collect()
    }

    /// Kinds used by a configuration that would resolve to nothing.
    ///
    /// Hosts call this once when loading a configuration.
    pub fn missing_kinds(&self, configuration: &OnboardingConfiguration) -> Vec<FieldKind> {
        let mut used = BTreeSet::new();
        for step in &configuration.steps {
            walk_fields(&step.fields, "", &mut |node: FieldNode<'_>, _path: &str, _depth: usize| {
                match node {
                    FieldNode::Leaf(field) | FieldNode::Group { field, .. } => {
                        used.insert(field.kind.as_str().to_string());
                    }
                    FieldNode::Array { field, entry, .. } => {
                        used.insert(field.kind.as_str().to_string());
                        // object entries render as `group` bindings
                        let entry_kind = match entry {
                            EntryTemplate::Scalar(template) => template.kind.clone(),
                            EntryTemplate::Fields(_) => FieldKind::Group,
                        };
                        used.insert(entry_kind.as_str().to_string());
                    }
                }
                true
            });
        }

        used.into_iter()
            .map(FieldKind::from)
            .filter(|kind| self.resolve(kind).is_none())
            .collect()
    }
}
