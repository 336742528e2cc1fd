use serde::{Deserialize, Serialize};
use std::fmt;

use super::VisibilityRule;

/// The closed set of field kinds the engine knows about, plus an escape
/// hatch for kinds registered by the host renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    #[default]
    Text,
    Textarea,
    Email,
    Phone,
    Number,
    Select,
    Radio,
    Multiselect,
    Checkbox,
    Date,
    Array,
    Group,
    DocumentUpload,
    IdentityScan,
    Custom(String),
}

impl FieldKind {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::Radio => "radio",
            FieldKind::Multiselect => "multiselect",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Array => "array",
            FieldKind::Group => "group",
            FieldKind::DocumentUpload => "documentUpload",
            FieldKind::IdentityScan => "identityScan",
            FieldKind::Custom(name) => name,
        }
    }

    /// Kinds whose value is a plain string typed or picked by the user.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Email
                | FieldKind::Phone
                | FieldKind::Select
                | FieldKind::Radio
                | FieldKind::Date
        )
    }

    /// Kinds that carry `options`.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio | FieldKind::Multiselect)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, FieldKind::Array | FieldKind::Group)
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "email" => FieldKind::Email,
            "phone" => FieldKind::Phone,
            "number" => FieldKind::Number,
            "select" => FieldKind::Select,
            "radio" => FieldKind::Radio,
            "multiselect" => FieldKind::Multiselect,
            "checkbox" => FieldKind::Checkbox,
            "date" => FieldKind::Date,
            "array" => FieldKind::Array,
            "group" => FieldKind::Group,
            "documentUpload" => FieldKind::DocumentUpload,
            "identityScan" => FieldKind::IdentityScan,
            _ => FieldKind::Custom(s),
        }
    }
}

impl From<&str> for FieldKind {
    fn from(s: &str) -> Self {
        FieldKind::from(s.to_string())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of the value a field produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

/// Validation rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Email,
    Number,
    DateRange,
    Custom,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::MinLength => "minLength",
            RuleKind::MaxLength => "maxLength",
            RuleKind::Pattern => "pattern",
            RuleKind::Email => "email",
            RuleKind::Number => "number",
            RuleKind::DateRange => "dateRange",
            RuleKind::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a field's ordered `validationRules` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub rule: RuleKind,

    /// Rule parameter: a length, a regex, a `{min, max}` date range, or the
    /// name of a custom rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// Message shown instead of the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationRule {
    pub fn new(rule: RuleKind, value: Option<serde_json::Value>) -> Self {
        Self { rule, value, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A selectable choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: serde_json::Value,
}

/// Entry bounds of an array field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArrayConfig {
    #[serde(default)]
    pub min_items: Option<usize>,
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// Declarative description of a single form field.
///
/// Fields nest: a `group` lists its sub-fields in `children`, an `array`
/// lists the sub-fields of each entry in `children` or describes one entry
/// with `item_template`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub field_name: String,

    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    #[serde(default, alias = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub data_type: DataType,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_visibility: Option<VisibilityRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_template: Option<Box<FieldDefinition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_config: Option<ArrayConfig>,
}

/// Shape of one array entry
#[derive(Debug, Clone, Copy)]
pub enum EntryTemplate<'a> {
    /// Each entry is an object with these sub-fields
    Fields(&'a [FieldDefinition]),
    /// Each entry is a single value described by this template
    Scalar(&'a FieldDefinition),
}

/// Tagged view over a field, used for structural recursion
#[derive(Debug, Clone, Copy)]
pub enum FieldNode<'a> {
    Leaf(&'a FieldDefinition),
    Group {
        field: &'a FieldDefinition,
        children: &'a [FieldDefinition],
    },
    Array {
        field: &'a FieldDefinition,
        entry: EntryTemplate<'a>,
        config: ArrayConfig,
    },
}

impl FieldDefinition {
    pub fn new(field_name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        let kind = kind.into();
        let data_type = match kind {
            FieldKind::Checkbox => DataType::Boolean,
            FieldKind::Number => DataType::Number,
            FieldKind::Date => DataType::Date,
            FieldKind::Array | FieldKind::Multiselect => DataType::Array,
            FieldKind::Group => DataType::Object,
            _ => DataType::String,
        };
        Self {
            field_name: field_name.into(),
            kind,
            data_type,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_visibility(mut self, rule: VisibilityRule) -> Self {
        self.conditional_visibility = Some(rule);
        self
    }

    pub fn with_children(mut self, children: Vec<FieldDefinition>) -> Self {
        self.children = children;
        self
    }

    pub fn with_array_config(mut self, min_items: Option<usize>, max_items: Option<usize>) -> Self {
        self.array_config = Some(ArrayConfig { min_items, max_items });
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// View this field as a tagged node
    pub fn node(&self) -> FieldNode<'_> {
        match self.kind {
            FieldKind::Group => FieldNode::Group {
                field: self,
                children: &self.children,
            },
            FieldKind::Array => FieldNode::Array {
                field: self,
                entry: self.entry_template(),
                config: self.array_config.unwrap_or_default(),
            },
            _ => FieldNode::Leaf(self),
        }
    }

    /// Per-entry shape of an array field. `children` wins over `item_template`.
    pub fn entry_template(&self) -> EntryTemplate<'_> {
        if !self.children.is_empty() {
            return EntryTemplate::Fields(&self.children);
        }
        match self.item_template.as_deref() {
            Some(template) if template.kind == FieldKind::Group => {
                EntryTemplate::Fields(&template.children)
            }
            Some(template) => EntryTemplate::Scalar(template),
            None => EntryTemplate::Fields(&[]),
        }
    }
}

/// Sort sibling fields by `order`, keeping declaration order for ties.
pub fn sorted_fields(fields: &[FieldDefinition]) -> Vec<&FieldDefinition> {
    let mut sorted: Vec<&FieldDefinition> = fields.iter().collect();
    sorted.sort_by_key(|f| f.order);
    sorted
}

/// Callback for [`walk_fields`]
pub trait FieldVisitor {
    /// Called for every declared field with its template path (no entry
    /// indices). Return `false` to skip the node's children.
    fn visit(&mut self, node: FieldNode<'_>, path: &str, depth: usize) -> bool;
}

impl<F> FieldVisitor for F
where
    F: FnMut(FieldNode<'_>, &str, usize) -> bool,
{
    fn visit(&mut self, node: FieldNode<'_>, path: &str, depth: usize) -> bool {
        self(node, path, depth)
    }
}

/// Depth-first walk over a declared field tree in declaration order.
///
/// Group and array children are addressed as `parent.child`; a scalar item
/// template is not visited separately since it has no path of its own.
pub fn walk_fields<V: FieldVisitor + ?Sized>(fields: &[FieldDefinition], prefix: &str, visitor: &mut V) {
    walk_at_depth(fields, prefix, 0, visitor);
}

fn walk_at_depth<V: FieldVisitor + ?Sized>(
    fields: &[FieldDefinition],
    prefix: &str,
    depth: usize,
    visitor: &mut V,
) {
    for field in fields {
        let path = crate::utils::path::join(prefix, &field.field_name);
        let node = field.node();
        if !visitor.visit(node, &path, depth) {
            continue;
        }
        match node {
            FieldNode::Leaf(_) => {}
            FieldNode::Group { children, .. } => walk_at_depth(children, &path, depth + 1, visitor),
            FieldNode::Array { entry, .. } => {
                if let EntryTemplate::Fields(children) = entry {
                    walk_at_depth(children, &path, depth + 1, visitor);
                }
            }
        }
    }
}
