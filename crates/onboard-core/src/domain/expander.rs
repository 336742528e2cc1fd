//! Repeater expansion: turning an `array` field plus its entries into
//! concretely named fields.
//!
//! Entry `i` of an array at `employers` is materialized as a group named
//! `employers.i`; its sub-fields become `employers.i.<name>`. Nested arrays
//! are expanded inside each entry, outer index first.

use onboard_dsl::{utils::path, EntryTemplate, FieldDefinition, FieldKind, FieldNode};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::DataSnapshot;

/// Expand an array field against its entries.
///
/// Returns one field per entry. Descendant names are qualified with the
/// entry path and visibility rules that name a sibling by its template path
/// are qualified to the same entry. Inside the result, a nested array keeps
/// kind `array` and lists its own expanded entries as `children`.
pub fn expand(array_field: &FieldDefinition, entries: &[Value]) -> Vec<FieldDefinition> {
    expand_at(array_field, &array_field.field_name, entries)
}

pub(crate) fn expand_at(array_field: &FieldDefinition, array_path: &str, entries: &[Value]) -> Vec<FieldDefinition> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry_path = path::indexed(array_path, index);
            match array_field.entry_template() {
                EntryTemplate::Fields(children) => {
                    let mut group = FieldDefinition::new(entry_path.clone(), FieldKind::Group);
                    group.label = array_field.label.clone();
                    group.children = children
                        .iter()
                        .map(|child| {
                            let mut child = child.clone();
                            qualify_rules(&mut child, array_path, &entry_path);
                            let child_path = path::join(&entry_path, &child.field_name);
                            materialize(&child, &child_path, entry.get(&child.field_name))
                        })
                        .collect();
                    group
                }
                EntryTemplate::Scalar(template) => {
                    let mut template = template.clone();
                    qualify_rules(&mut template, array_path, &entry_path);
                    materialize(&template, &entry_path, Some(entry))
                }
            }
        })
        .collect()
}

/// Clone `field` under its materialized `path`, expanding any arrays
/// beneath it from `value`.
pub(crate) fn materialize(field: &FieldDefinition, field_path: &str, value: Option<&Value>) -> FieldDefinition {
    let mut materialized = field.clone();
    materialized.field_name = field_path.to_string();

    match field.node() {
        FieldNode::Leaf(_) => {}
        FieldNode::Group { children, .. } => {
            materialized.children = children
                .iter()
                .map(|child| {
                    let child_path = path::join(field_path, &child.field_name);
                    materialize(child, &child_path, value.and_then(|v| v.get(&child.field_name)))
                })
                .collect();
        }
        FieldNode::Array { .. } => {
            let entries = value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
            materialized.children = expand_at(field, field_path, entries);
            materialized.item_template = None;
        }
    }

    materialized
}

/// Rewrite `dependsOn` paths under `array_path` that do not already carry an
/// entry index so they point into `entry_path`.
fn qualify_rules(field: &mut FieldDefinition, array_path: &str, entry_path: &str) {
    if let Some(rule) = field.conditional_visibility.as_mut() {
        if let Some(qualified) = path::rebase(&rule.depends_on, array_path, entry_path) {
            rule.depends_on = qualified;
        }
    }
    for child in field.children.iter_mut() {
        qualify_rules(child, array_path, entry_path);
    }
    if let Some(template) = field.item_template.as_deref_mut() {
        qualify_rules(template, array_path, entry_path);
    }
}

/// The value a field holds before the user touches it
pub fn empty_value(field: &FieldDefinition) -> Value {
    match &field.kind {
        FieldKind::Checkbox => Value::Bool(false),
        FieldKind::Array | FieldKind::Multiselect => Value::Array(Vec::new()),
        FieldKind::Group => Value::Object(seed_fields(&field.children)),
        kind if kind.is_text_like() => Value::String(String::new()),
        _ => Value::Null,
    }
}

/// A freshly seeded entry for an array field
pub fn empty_entry(array_field: &FieldDefinition) -> Value {
    match array_field.entry_template() {
        EntryTemplate::Fields(children) => Value::Object(seed_fields(children)),
        EntryTemplate::Scalar(template) => empty_value(template),
    }
}

fn seed_fields(fields: &[FieldDefinition]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.field_name.clone(), empty_value(f)))
        .collect()
}

/// Whether another entry may be added
pub fn can_add(array_field: &FieldDefinition, len: usize) -> bool {
    let config = array_field.array_config.unwrap_or_default();
    config.max_items.map_or(true, |max| len < max)
}

/// Whether an entry may be removed without going under `minItems`
pub fn can_remove(array_field: &FieldDefinition, len: usize) -> bool {
    let config = array_field.array_config.unwrap_or_default();
    len > config.min_items.unwrap_or(0)
}

/// Append a seeded entry to the array at `array_path`; returns its index.
pub fn append_entry(
    snapshot: &mut DataSnapshot,
    array_field: &FieldDefinition,
    array_path: &str,
) -> Result<usize, CoreError> {
    ensure_array(array_field, array_path)?;
    let len = match snapshot.get(array_path) {
        None | Some(Value::Null) => 0,
        Some(Value::Array(items)) => items.len(),
        Some(_) => {
            return Err(CoreError::ArrayError(format!("'{}' does not hold a list", array_path)));
        }
    };

    if !can_add(array_field, len) {
        return Err(CoreError::ArrayError(format!(
            "'{}' already has the maximum of {} entries",
            array_path, len
        )));
    }

    if len == 0 {
        snapshot.set(array_path, Value::Array(Vec::new()))?;
    }
    snapshot.set(&path::indexed(array_path, len), empty_entry(array_field))?;
    tracing::debug!(array = %array_path, index = len, "Appended array entry");
    Ok(len)
}

/// Remove entry `index`; later entries shift down by one.
pub fn remove_entry(
    snapshot: &mut DataSnapshot,
    array_field: &FieldDefinition,
    array_path: &str,
    index: usize,
) -> Result<Value, CoreError> {
    ensure_array(array_field, array_path)?;
    let len = snapshot.array_len(array_path);
    if index >= len {
        return Err(CoreError::ArrayError(format!(
            "'{}' has no entry {} (length {})",
            array_path, index, len
        )));
    }

    let removed = snapshot
        .remove(&path::indexed(array_path, index))
        .ok_or_else(|| CoreError::ArrayError(format!("'{}' has no entry {}", array_path, index)))?;
    tracing::debug!(array = %array_path, index, "Removed array entry");
    Ok(removed)
}

fn ensure_array(field: &FieldDefinition, array_path: &str) -> Result<(), CoreError> {
    if field.kind == FieldKind::Array {
        Ok(())
    } else {
        Err(CoreError::ArrayError(format!("'{}' is not an array field", array_path)))
    }
}
