//! Visibility resolution over a configuration and a data snapshot.

use onboard_dsl::{
    model::sorted_fields, utils::path, EntryTemplate, FieldDefinition, FieldKind, FieldNode,
    OnboardingConfiguration, StepDefinition,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::expander;
use super::rule::{evaluate, Diagnostics};
use crate::types::DataSnapshot;

/// Steps and top-level fields visible for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVisibility<'a> {
    /// Visible steps sorted by `order`
    pub steps: Vec<&'a StepDefinition>,
    /// Visible top-level fields per visible step key, sorted by `order`
    pub fields_by_step: HashMap<String, Vec<&'a FieldDefinition>>,
}

impl<'a> ResolvedVisibility<'a> {
    pub fn step_keys(&self) -> Vec<&'a str> {
        self.steps.iter().map(|s| s.key.as_str()).collect()
    }

    pub fn is_step_visible(&self, key: &str) -> bool {
        self.steps.iter().any(|s| s.key == key)
    }
}

/// Whether a step's own rule lets it show
pub fn is_step_visible(step: &StepDefinition, snapshot: &DataSnapshot, diagnostics: &mut Diagnostics) -> bool {
    step.conditional_visibility
        .as_ref()
        .map_or(true, |rule| evaluate(rule, snapshot, diagnostics))
}

/// Resolve visible steps and their visible top-level fields.
///
/// Pure apart from diagnostics: resolving twice on the same snapshot gives
/// equal results.
pub fn resolve_visible<'a>(
    configuration: &'a OnboardingConfiguration,
    snapshot: &DataSnapshot,
    diagnostics: &mut Diagnostics,
) -> ResolvedVisibility<'a> {
    let mut steps = Vec::new();
    let mut fields_by_step = HashMap::new();

    for step in configuration.ordered_steps() {
        if !is_step_visible(step, snapshot, diagnostics) {
            continue;
        }
        let fields: Vec<&FieldDefinition> = sorted_fields(&step.fields)
            .into_iter()
            .filter(|field| {
                field
                    .conditional_visibility
                    .as_ref()
                    .map_or(true, |rule| evaluate(rule, snapshot, diagnostics))
            })
            .collect();
        fields_by_step.insert(step.key.clone(), fields);
        steps.push(step);
    }

    ResolvedVisibility { steps, fields_by_step }
}

/// Materialize every visible field of a step into a flat list.
///
/// Each returned field is named by its materialized path and has its
/// `children` cleared; containers precede their descendants. A field hidden
/// by its rule hides its whole subtree.
pub fn materialize_step(
    step: &StepDefinition,
    snapshot: &DataSnapshot,
    diagnostics: &mut Diagnostics,
) -> Vec<FieldDefinition> {
    let mut out = Vec::new();
    for field in sorted_fields(&step.fields) {
        let materialized = expander::materialize(field, &field.field_name, snapshot.get(&field.field_name));
        flatten_visible(materialized, snapshot, diagnostics, &mut out);
    }
    out
}

fn flatten_visible(
    mut field: FieldDefinition,
    snapshot: &DataSnapshot,
    diagnostics: &mut Diagnostics,
    out: &mut Vec<FieldDefinition>,
) {
    if let Some(rule) = &field.conditional_visibility {
        if !evaluate(rule, snapshot, diagnostics) {
            return;
        }
    }

    let mut children = std::mem::take(&mut field.children);
    children.sort_by_key(|c| c.order);
    out.push(field);

    for child in children {
        flatten_visible(child, snapshot, diagnostics, out);
    }
}

/// Build the submission payload: values at visible materialized paths only.
///
/// Hidden values are dropped. Visible arrays keep their entry count and
/// visible groups are present even when none of their fields hold a value.
pub fn visible_payload(
    configuration: &OnboardingConfiguration,
    snapshot: &DataSnapshot,
    diagnostics: &mut Diagnostics,
) -> DataSnapshot {
    let mut payload = DataSnapshot::new();

    for step in configuration.ordered_steps() {
        if !is_step_visible(step, snapshot, diagnostics) {
            continue;
        }
        for field in materialize_step(step, snapshot, diagnostics) {
            let copied = match field.kind {
                FieldKind::Array => {
                    let entries: Vec<Value> = snapshot
                        .get(&field.field_name)
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .map(|entry| match entry {
                                    Value::Object(_) => Value::Object(Map::new()),
                                    _ => Value::Null,
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    payload.set(&field.field_name, Value::Array(entries))
                }
                FieldKind::Group => payload.set(&field.field_name, Value::Object(Map::new())),
                _ => match snapshot.get(&field.field_name) {
                    Some(value) => payload.set(&field.field_name, value.clone()),
                    None => Ok(()),
                },
            };
            // only reachable if the snapshot itself has a scalar where a container was declared
            if let Err(e) = copied {
                diagnostics.report(field.field_name.clone(), format!("value not copied to payload: {}", e));
            }
        }
    }

    payload
}

/// Find a declared field by its template path (entry indices stripped)
pub fn declared_field<'a>(configuration: &'a OnboardingConfiguration, template: &str) -> Option<&'a FieldDefinition> {
    configuration
        .steps
        .iter()
        .find_map(|step| find_declared(&step.fields, "", template))
}

fn find_declared<'a>(fields: &'a [FieldDefinition], prefix: &str, template: &str) -> Option<&'a FieldDefinition> {
    for field in fields {
        let field_path = path::join(prefix, &field.field_name);
        if field_path == template {
            return Some(field);
        }
        if !path::is_within(template, &field_path) {
            continue;
        }
        let children = match field.node() {
            FieldNode::Group { children, .. } => children,
            FieldNode::Array { entry: EntryTemplate::Fields(children), .. } => children,
            _ => return None,
        };
        return find_declared(children, &field_path, template);
    }
    None
}

/// Key of the step declaring the top-level field of `path`
pub fn owning_step<'a>(configuration: &'a OnboardingConfiguration, field_path: &str) -> Option<&'a StepDefinition> {
    let root = field_path.split('.').next().unwrap_or_default();
    configuration
        .steps
        .iter()
        .find(|step| step.fields.iter().any(|f| f.field_name == root))
}
