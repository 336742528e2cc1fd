//! Editor draft state as an explicit transition function.
//!
//! The editor UI dispatches [`EditorAction`]s; [`reduce`] returns the next
//! [`EditorState`] without touching the previous one. Structural changes
//! (anything that could invalidate an in-flight session) bump the draft's
//! `version` once per save cycle.

use crate::model::{FieldDefinition, OnboardingConfiguration, StepDefinition, VisibilityRule};

/// In-memory draft held by the configuration editor
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub draft: OnboardingConfiguration,

    /// Unsaved changes exist
    pub dirty: bool,

    /// `version` has already been bumped since the last save
    version_bumped: bool,
}

/// Every edit the editor can perform
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    AddStep(StepDefinition),
    RemoveStep { key: String },
    UpdateStep { key: String, title: String, description: Option<String> },
    SetStepVisibility { key: String, rule: Option<VisibilityRule> },
    MoveStep { key: String, to_index: usize },
    AddField { step_key: String, field: FieldDefinition },
    UpdateField { step_key: String, field_name: String, field: FieldDefinition },
    RemoveField { step_key: String, field_name: String },
    MoveField { step_key: String, field_name: String, to_index: usize },
    SetMetadata {
        name: String,
        target_user_type: String,
        target_org_type: String,
        is_active: bool,
    },
    /// The draft was persisted
    MarkSaved,
}

impl EditorAction {
    /// Whether the action changes the form's structure
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            EditorAction::UpdateStep { .. } | EditorAction::SetMetadata { .. } | EditorAction::MarkSaved
        )
    }
}

impl EditorState {
    pub fn new(draft: OnboardingConfiguration) -> Self {
        Self {
            draft,
            dirty: false,
            version_bumped: false,
        }
    }
}

/// Apply one action to the editor state.
///
/// Actions that reference a missing step or field leave the state unchanged.
pub fn reduce(state: EditorState, action: EditorAction) -> EditorState {
    let mut next = state.clone();
    let structural = action.is_structural();

    let applied = match action {
        EditorAction::AddStep(mut step) => {
            if next.draft.step(&step.key).is_some() {
                false
            } else {
                if step.order == 0 {
                    step.order = next.draft.steps.iter().map(|s| s.order + 1).max().unwrap_or(0);
                }
                next.draft.steps.push(step);
                true
            }
        }
        EditorAction::RemoveStep { key } => {
            let before = next.draft.steps.len();
            next.draft.steps.retain(|s| s.key != key);
            next.draft.steps.len() != before
        }
        EditorAction::UpdateStep { key, title, description } => match step_mut(&mut next.draft, &key) {
            Some(step) => {
                step.title = title;
                step.description = description;
                true
            }
            None => false,
        },
        EditorAction::SetStepVisibility { key, rule } => match step_mut(&mut next.draft, &key) {
            Some(step) => {
                step.conditional_visibility = rule;
                true
            }
            None => false,
        },
        EditorAction::MoveStep { key, to_index } => {
            let mut ordered: Vec<StepDefinition> = next.draft.ordered_steps().into_iter().cloned().collect();
            match ordered.iter().position(|s| s.key == key) {
                Some(from) => {
                    let step = ordered.remove(from);
                    let to = to_index.min(ordered.len());
                    ordered.insert(to, step);
                    for (order, step) in ordered.iter_mut().enumerate() {
                        step.order = order as i32;
                    }
                    next.draft.steps = ordered;
                    true
                }
                None => false,
            }
        }
        EditorAction::AddField { step_key, mut field } => match step_mut(&mut next.draft, &step_key) {
            Some(step) if !step.fields.iter().any(|f| f.field_name == field.field_name) => {
                if field.order == 0 {
                    field.order = step.fields.iter().map(|f| f.order + 1).max().unwrap_or(0);
                }
                step.fields.push(field);
                true
            }
            _ => false,
        },
        EditorAction::UpdateField { step_key, field_name, field } => {
            match step_mut(&mut next.draft, &step_key)
                .and_then(|step| step.fields.iter_mut().find(|f| f.field_name == field_name))
            {
                Some(existing) => {
                    *existing = field;
                    true
                }
                None => false,
            }
        }
        EditorAction::RemoveField { step_key, field_name } => match step_mut(&mut next.draft, &step_key) {
            Some(step) => {
                let before = step.fields.len();
                step.fields.retain(|f| f.field_name != field_name);
                step.fields.len() != before
            }
            None => false,
        },
        EditorAction::MoveField { step_key, field_name, to_index } => match step_mut(&mut next.draft, &step_key) {
            Some(step) => {
                let mut ordered: Vec<FieldDefinition> =
                    crate::model::sorted_fields(&step.fields).into_iter().cloned().collect();
                match ordered.iter().position(|f| f.field_name == field_name) {
                    Some(from) => {
                        let field = ordered.remove(from);
                        let to = to_index.min(ordered.len());
                        ordered.insert(to, field);
                        for (order, field) in ordered.iter_mut().enumerate() {
                            field.order = order as i32;
                        }
                        step.fields = ordered;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        },
        EditorAction::SetMetadata { name, target_user_type, target_org_type, is_active } => {
            next.draft.name = name;
            next.draft.target_user_type = target_user_type;
            next.draft.target_org_type = target_org_type;
            next.draft.is_active = is_active;
            true
        }
        EditorAction::MarkSaved => {
            next.dirty = false;
            next.version_bumped = false;
            return next;
        }
    };

    if !applied {
        tracing::debug!(configuration_id = %state.draft.id, "Editor action did not match the draft; ignored");
        return state;
    }

    next.dirty = true;
    if structural && !next.version_bumped {
        next.draft.version += 1;
        next.version_bumped = true;
    }
    next
}

fn step_mut<'a>(draft: &'a mut OnboardingConfiguration, key: &str) -> Option<&'a mut StepDefinition> {
    draft.steps.iter_mut().find(|s| s.key == key)
}
