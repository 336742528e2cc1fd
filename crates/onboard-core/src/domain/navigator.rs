//! Step navigation state machine.
//!
//! [`transition`] is a pure function from a [`NavigatorState`] and a
//! [`NavigationAction`] to the next state. Indices address the list of
//! currently visible steps; the current step is also tracked by key so the
//! index can be re-derived when visibility changes.

use onboard_dsl::{OnboardingConfiguration, StepDefinition};
use serde::{Deserialize, Serialize};

use super::field_rules::{validate_field, CustomRuleRegistry, FieldError, RuleContext};
use super::rule::Diagnostics;
use super::visibility::{materialize_step, resolve_visible, visible_payload};
use crate::error::CoreError;
use crate::types::DataSnapshot;

/// Navigation requests a user can make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "camelCase")]
pub enum NavigationAction {
    Next,
    Previous,
    JumpTo(usize),
    Submit,
}

/// Where a session stands in its configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorState {
    /// Key of the current step, empty when no step is visible
    pub current_step_key: String,
    /// Index of the current step among the visible steps
    pub current_step_index: usize,
    /// Steps that passed validation, in completion order
    pub completed_step_keys: Vec<String>,
    /// Set once a submit transition succeeded
    #[serde(default)]
    pub submitted: bool,
}

impl NavigatorState {
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed_step_keys.iter().any(|k| k == key)
    }

    fn mark_completed(&mut self, key: &str) {
        if !self.is_completed(key) {
            self.completed_step_keys.push(key.to_string());
        }
    }
}

/// Inputs a transition reads
pub struct NavigationContext<'a> {
    pub configuration: &'a OnboardingConfiguration,
    pub snapshot: &'a DataSnapshot,
    pub custom_rules: &'a CustomRuleRegistry,
    pub diagnostics: &'a mut Diagnostics,
}

/// Result of applying a navigation action
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The action was applied
    Moved(NavigatorState),
    /// Validation failed; the state is unchanged apart from realignment
    Blocked {
        state: NavigatorState,
        errors: Vec<FieldError>,
    },
    /// Every visible field passed; `payload` holds only visible values
    ReadyToSubmit {
        state: NavigatorState,
        payload: DataSnapshot,
    },
}

impl Transition {
    pub fn state(&self) -> &NavigatorState {
        match self {
            Transition::Moved(state) => state,
            Transition::Blocked { state, .. } => state,
            Transition::ReadyToSubmit { state, .. } => state,
        }
    }

    pub fn into_state(self) -> NavigatorState {
        match self {
            Transition::Moved(state) => state,
            Transition::Blocked { state, .. } => state,
            Transition::ReadyToSubmit { state, .. } => state,
        }
    }
}

/// Initial state: the first visible step
pub fn initial_state(ctx: &mut NavigationContext<'_>) -> NavigatorState {
    let visible = visible_step_keys(ctx);
    NavigatorState {
        current_step_key: visible.first().cloned().unwrap_or_default(),
        ..Default::default()
    }
}

/// Re-derive the current index from the current key.
///
/// If the current step became hidden the nearest preceding visible step
/// becomes current, falling back to the first visible step.
pub fn realign(state: &NavigatorState, ctx: &mut NavigationContext<'_>) -> NavigatorState {
    let visible = visible_step_keys(ctx);
    let mut next = state.clone();

    if let Some(index) = visible.iter().position(|k| *k == state.current_step_key) {
        next.current_step_index = index;
        return next;
    }

    let ordered: Vec<&str> = ctx
        .configuration
        .ordered_steps()
        .into_iter()
        .map(|s| s.key.as_str())
        .collect();
    let current_position = ordered.iter().position(|k| *k == state.current_step_key);

    let fallback = current_position.and_then(|current| {
        visible
            .iter()
            .enumerate()
            .filter(|(_, key)| {
                ordered
                    .iter()
                    .position(|k| k == key)
                    .map_or(false, |position| position < current)
            })
            .last()
            .map(|(index, _)| index)
    });

    next.current_step_index = fallback.unwrap_or(0);
    next.current_step_key = visible.get(next.current_step_index).cloned().unwrap_or_default();
    next
}

/// Apply a navigation action.
///
/// # Errors
///
/// * [`CoreError::AlreadySubmitted`] for any action after a successful submit
/// * [`CoreError::NavigationError`] for a jump past the furthest completed
///   step, or a submit from anywhere but the last visible step
pub fn transition(
    state: &NavigatorState,
    action: NavigationAction,
    ctx: &mut NavigationContext<'_>,
) -> Result<Transition, CoreError> {
    if state.submitted {
        return Err(CoreError::AlreadySubmitted);
    }

    let mut state = realign(state, ctx);
    let visible = visible_step_keys(ctx);
    if visible.is_empty() {
        return Err(CoreError::NavigationError("no step is visible".to_string()));
    }
    let last = visible.len() - 1;

    match action {
        NavigationAction::Previous => {
            state.current_step_index = state.current_step_index.saturating_sub(1);
            state.current_step_key = visible[state.current_step_index].clone();
            Ok(Transition::Moved(state))
        }
        NavigationAction::Next => {
            let errors = validate_step_by_key(&state.current_step_key, ctx);
            if !errors.is_empty() {
                return Ok(Transition::Blocked { state, errors });
            }

            let completed = state.current_step_key.clone();
            state.mark_completed(&completed);

            // the step just entered may depend on data written on this one
            let visible = visible_step_keys(ctx);
            let from = visible.iter().position(|k| *k == completed).unwrap_or(state.current_step_index);
            state.current_step_index = (from + 1).min(visible.len().saturating_sub(1));
            state.current_step_key = visible.get(state.current_step_index).cloned().unwrap_or_default();
            Ok(Transition::Moved(state))
        }
        NavigationAction::JumpTo(target) => {
            if target >= visible.len() {
                return Err(CoreError::NavigationError(format!(
                    "step {} does not exist ({} visible steps)",
                    target,
                    visible.len()
                )));
            }
            let furthest_completed = visible
                .iter()
                .enumerate()
                .filter(|(_, key)| state.is_completed(key))
                .map(|(index, _)| index)
                .max();
            let allowed = target == state.current_step_index
                || furthest_completed.map_or(false, |furthest| target <= furthest);
            if !allowed {
                return Err(CoreError::NavigationError(format!(
                    "step {} cannot be reached before completing the steps before it",
                    target
                )));
            }
            state.current_step_index = target;
            state.current_step_key = visible[target].clone();
            Ok(Transition::Moved(state))
        }
        NavigationAction::Submit => {
            if state.current_step_index != last {
                return Err(CoreError::NavigationError(
                    "submit is only available from the last step".to_string(),
                ));
            }

            let errors = validate_all(ctx);
            if !errors.is_empty() {
                return Ok(Transition::Blocked { state, errors });
            }

            let current = state.current_step_key.clone();
            state.mark_completed(&current);
            state.submitted = true;
            let payload = visible_payload(ctx.configuration, ctx.snapshot, ctx.diagnostics);
            Ok(Transition::ReadyToSubmit { state, payload })
        }
    }
}

/// Validate every visible materialized field of a step
pub fn validate_step(step: &StepDefinition, ctx: &mut NavigationContext<'_>) -> Vec<FieldError> {
    let snapshot = ctx.snapshot;
    let fields = materialize_step(step, snapshot, ctx.diagnostics);
    let mut rule_ctx = RuleContext {
        snapshot,
        custom_rules: ctx.custom_rules,
        diagnostics: &mut *ctx.diagnostics,
    };
    fields
        .iter()
        .filter_map(|field| validate_field(field, &field.field_name, snapshot.get(&field.field_name), &mut rule_ctx))
        .collect()
}

/// Validate every visible field of every visible step
pub fn validate_all(ctx: &mut NavigationContext<'_>) -> Vec<FieldError> {
    let configuration = ctx.configuration;
    let visible: Vec<&StepDefinition> = resolve_visible(configuration, ctx.snapshot, ctx.diagnostics).steps;
    visible.into_iter().flat_map(|step| validate_step(step, ctx)).collect()
}

fn validate_step_by_key(key: &str, ctx: &mut NavigationContext<'_>) -> Vec<FieldError> {
    match ctx.configuration.step(key) {
        Some(step) => validate_step(step, ctx),
        None => Vec::new(),
    }
}

fn visible_step_keys(ctx: &mut NavigationContext<'_>) -> Vec<String> {
    resolve_visible(ctx.configuration, ctx.snapshot, ctx.diagnostics)
        .step_keys()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_dsl::{FieldDefinition, FieldKind, RuleKind, ValidationRule, VisibilityRule};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn configuration() -> OnboardingConfiguration {
        OnboardingConfiguration::new("visa", "Visa")
            .with_step(
                StepDefinition::new("history", "History")
                    .with_order(0)
                    .with_field(FieldDefinition::new("hasPreviousVisas", FieldKind::Checkbox))
                    .with_field(
                        FieldDefinition::new("name", FieldKind::Text)
                            .required()
                            .with_rule(ValidationRule::new(RuleKind::MinLength, Some(json!(2)))),
                    ),
            )
            .with_step(
                StepDefinition::new("visas", "Previous visas")
                    .with_order(1)
                    .with_visibility(VisibilityRule::new("hasPreviousVisas", "equals", Some(json!(true))))
                    .with_field(FieldDefinition::new("visaCountry", FieldKind::Text).required()),
            )
            .with_step(
                StepDefinition::new("contact", "Contact")
                    .with_order(2)
                    .with_field(FieldDefinition::new("email", FieldKind::Email)),
            )
    }

    struct Fixture {
        configuration: OnboardingConfiguration,
        snapshot: DataSnapshot,
        custom_rules: CustomRuleRegistry,
        diagnostics: Diagnostics,
    }

    impl Fixture {
        fn new(data: serde_json::Value) -> Self {
            Self {
                configuration: configuration(),
                snapshot: DataSnapshot::from_value(data).unwrap(),
                custom_rules: CustomRuleRegistry::new(),
                diagnostics: Diagnostics::new(),
            }
        }

        fn ctx(&mut self) -> NavigationContext<'_> {
            NavigationContext {
                configuration: &self.configuration,
                snapshot: &self.snapshot,
                custom_rules: &self.custom_rules,
                diagnostics: &mut self.diagnostics,
            }
        }

        fn apply(&mut self, state: &NavigatorState, action: NavigationAction) -> Result<Transition, CoreError> {
            transition(state, action, &mut self.ctx())
        }
    }

    #[test]
    fn test_next_blocks_on_invalid_step() {
        let mut fixture = Fixture::new(json!({ "name": "A" }));
        let state = initial_state(&mut fixture.ctx());

        match fixture.apply(&state, NavigationAction::Next).unwrap() {
            Transition::Blocked { state, errors } => {
                assert_eq!(state.current_step_key, "history");
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field_name, "name");
                assert_eq!(errors[0].rule, "minLength");
            }
            other => panic!("expected a blocked transition, got {:?}", other),
        }
    }

    #[test]
    fn test_next_skips_hidden_step() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": false }));
        let state = initial_state(&mut fixture.ctx());

        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();

        assert_eq!(state.current_step_key, "contact");
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.completed_step_keys, vec!["history".to_string()]);
    }

    #[test]
    fn test_next_enters_revealed_step() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": true }));
        let state = initial_state(&mut fixture.ctx());

        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();
        assert_eq!(state.current_step_key, "visas");
    }

    #[test]
    fn test_previous_is_clamped() {
        let mut fixture = Fixture::new(json!({}));
        let state = initial_state(&mut fixture.ctx());

        let state = fixture.apply(&state, NavigationAction::Previous).unwrap().into_state();
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.current_step_key, "history");
    }

    #[test]
    fn test_jump_policy() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": true }));
        let state = initial_state(&mut fixture.ctx());

        assert!(matches!(
            fixture.apply(&state, NavigationAction::JumpTo(2)),
            Err(CoreError::NavigationError(_))
        ));
        assert!(fixture.apply(&state, NavigationAction::JumpTo(0)).is_ok());

        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();
        let back = fixture.apply(&state, NavigationAction::JumpTo(0)).unwrap().into_state();
        assert_eq!(back.current_step_key, "history");
        assert!(fixture.apply(&back, NavigationAction::JumpTo(1)).is_err());
        assert!(fixture.apply(&back, NavigationAction::JumpTo(9)).is_err());
    }

    #[test]
    fn test_submit_only_from_last_step() {
        let mut fixture = Fixture::new(json!({ "name": "Al" }));
        let state = initial_state(&mut fixture.ctx());

        assert!(matches!(
            fixture.apply(&state, NavigationAction::Submit),
            Err(CoreError::NavigationError(_))
        ));
    }

    #[test]
    fn test_submit_revalidates_revealed_steps() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": false }));
        let state = initial_state(&mut fixture.ctx());
        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();
        assert_eq!(state.current_step_key, "contact");

        // a later edit reveals the visas step the user never saw
        fixture.snapshot.set("hasPreviousVisas", json!(true)).unwrap();
        let state = realign(&state, &mut fixture.ctx());
        assert_eq!(state.current_step_index, 2);

        match fixture.apply(&state, NavigationAction::Submit).unwrap() {
            Transition::Blocked { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field_name, "visaCountry");
            }
            other => panic!("expected a blocked transition, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_succeeds_once() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": false, "visaCountry": "JP" }));
        let state = initial_state(&mut fixture.ctx());
        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();

        let submitted = match fixture.apply(&state, NavigationAction::Submit).unwrap() {
            Transition::ReadyToSubmit { state, payload } => {
                assert_eq!(payload.into_value(), json!({ "hasPreviousVisas": false, "name": "Al" }));
                state
            }
            other => panic!("expected submission, got {:?}", other),
        };

        assert!(submitted.submitted);
        assert_eq!(
            fixture.apply(&submitted, NavigationAction::Submit),
            Err(CoreError::AlreadySubmitted)
        );
    }

    #[test]
    fn test_hidden_current_step_falls_back_to_previous_visible() {
        let mut fixture = Fixture::new(json!({ "name": "Al", "hasPreviousVisas": true }));
        let state = initial_state(&mut fixture.ctx());
        let state = fixture.apply(&state, NavigationAction::Next).unwrap().into_state();
        assert_eq!(state.current_step_key, "visas");

        fixture.snapshot.set("hasPreviousVisas", json!(false)).unwrap();
        let state = realign(&state, &mut fixture.ctx());

        assert_eq!(state.current_step_key, "history");
        assert_eq!(state.current_step_index, 0);
    }

    #[test]
    fn test_action_serialization() {
        assert_eq!(serde_json::to_value(NavigationAction::JumpTo(2)).unwrap(), json!({ "type": "jumpTo", "index": 2 }));
        assert_eq!(serde_json::to_value(NavigationAction::Next).unwrap(), json!({ "type": "next" }));
    }
}
