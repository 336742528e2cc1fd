use std::cell::Cell;
use std::sync::Arc;

use onboard_core::{
    evaluate, resolve_visible, CoreError, DataSnapshot, Diagnostics, FormSession, StepOutcome,
};
use onboard_core::domain::visibility::visible_payload;
use onboard_dsl::{
    FieldDefinition, FieldKind, OnboardingConfiguration, RuleKind, StepDefinition, ValidationRule,
    VisibilityRule,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn visa_configuration() -> Arc<OnboardingConfiguration> {
    Arc::new(
        OnboardingConfiguration::new("visa-2024", "Visa application")
            .with_step(
                StepDefinition::new("history", "History")
                    .with_field(FieldDefinition::new("hasPreviousVisas", FieldKind::Checkbox)),
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
                    .with_field(FieldDefinition::new("email", FieldKind::Email).required()),
            ),
    )
}

fn employers_configuration() -> Arc<OnboardingConfiguration> {
    Arc::new(
        OnboardingConfiguration::new("jobs", "Jobs").with_step(
            StepDefinition::new("work", "Work").with_field(
                FieldDefinition::new("employers", FieldKind::Array)
                    .with_array_config(Some(1), None)
                    .with_children(vec![FieldDefinition::new("name", FieldKind::Text).required()]),
            ),
        ),
    )
}

fn field_names(session: &mut FormSession) -> Vec<String> {
    session.widgets().into_iter().map(|w| w.field_name).collect()
}

#[test]
fn test_hidden_step_is_skipped_and_excluded() {
    let mut session = FormSession::start(visa_configuration()).unwrap();
    session.set_value("hasPreviousVisas", json!(true)).unwrap();
    session.set_value("visaCountry", json!("FR")).unwrap();
    session.set_value("hasPreviousVisas", json!(false)).unwrap();

    assert_eq!(session.visible_step_keys(), vec!["history", "contact"]);
    assert_eq!(
        session.next().unwrap(),
        StepOutcome::Moved { step_key: "contact".to_string(), step_index: 1 }
    );

    session.set_value("email", json!("al@example.com")).unwrap();
    let mut received = None;
    assert_eq!(session.submit(|payload| received = Some(payload)).unwrap(), StepOutcome::Submitted);

    let payload = received.unwrap();
    assert_eq!(payload.get("visaCountry"), None);
    assert_eq!(payload.get("email"), Some(&json!("al@example.com")));
    // hidden data stays in the snapshot
    assert_eq!(session.snapshot().get("visaCountry"), Some(&json!("FR")));
}

#[test]
fn test_visible_step_joins_submit_validation() {
    let mut session = FormSession::start(visa_configuration()).unwrap();
    session.set_value("hasPreviousVisas", json!(true)).unwrap();

    assert_eq!(
        session.next().unwrap(),
        StepOutcome::Moved { step_key: "visas".to_string(), step_index: 1 }
    );
    match session.next().unwrap() {
        StepOutcome::Invalid(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field_name, "visaCountry");
            assert_eq!(errors[0].rule, "required");
        }
        other => panic!("expected validation errors, got {:?}", other),
    }

    session.set_value("visaCountry", json!("FR")).unwrap();
    session.next().unwrap();
    session.set_value("email", json!("al@example.com")).unwrap();

    let mut received = None;
    session.submit(|payload| received = Some(payload.into_value())).unwrap();
    assert_eq!(
        received,
        Some(json!({ "hasPreviousVisas": true, "visaCountry": "FR", "email": "al@example.com" }))
    );
}

#[test]
fn test_submit_only_from_last_visible_step() {
    let mut session = FormSession::start(visa_configuration()).unwrap();
    let err = session.submit(|_| panic!("must not be called")).unwrap_err();
    assert!(matches!(err, CoreError::NavigationError(_)));
}

#[test]
fn test_min_length_then_single_submission() {
    let configuration = Arc::new(
        OnboardingConfiguration::new("profile", "Profile").with_step(
            StepDefinition::new("about", "About").with_field(
                FieldDefinition::new("name", FieldKind::Text)
                    .required()
                    .with_rule(ValidationRule::new(RuleKind::MinLength, Some(json!(2)))),
            ),
        ),
    );
    let mut session = FormSession::start(configuration).unwrap();
    let calls = Cell::new(0);

    session.set_value("name", json!("A")).unwrap();
    match session.submit(|_| calls.set(calls.get() + 1)).unwrap() {
        StepOutcome::Invalid(errors) => {
            assert_eq!(errors[0].field_name, "name");
            assert_eq!(errors[0].rule, "minLength");
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
    assert_eq!(calls.get(), 0);

    session.set_value("name", json!("Al")).unwrap();
    let mut received = Value::Null;
    session
        .submit(|payload| {
            calls.set(calls.get() + 1);
            received = payload.into_value();
        })
        .unwrap();
    assert_eq!(received, json!({ "name": "Al" }));

    assert_eq!(session.submit(|_| calls.set(calls.get() + 1)), Err(CoreError::AlreadySubmitted));
    assert_eq!(calls.get(), 1);
    assert!(session.is_submitted());
}

#[test]
fn test_failed_hand_off_can_be_retried() {
    let mut session = FormSession::start(employers_configuration()).unwrap();
    session.append_entry("employers").unwrap();
    session.set_value("employers.0.name", json!("Acme")).unwrap();

    let err = session
        .try_submit(|_| Err(CoreError::IOError("network down".to_string())))
        .unwrap_err();
    assert_eq!(err, CoreError::IOError("network down".to_string()));
    assert!(!session.is_submitted());
    assert_eq!(session.snapshot().get("employers.0.name"), Some(&json!("Acme")));

    assert_eq!(session.try_submit(|_| Ok(())).unwrap(), StepOutcome::Submitted);
}

#[test]
fn test_min_items_blocks_until_entry_is_complete() {
    let mut session = FormSession::start(employers_configuration()).unwrap();

    match session.submit(|_| {}).unwrap() {
        StepOutcome::Invalid(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field_name, "employers");
        }
        other => panic!("expected validation errors, got {:?}", other),
    }

    session.append_entry("employers").unwrap();
    match session.submit(|_| {}).unwrap() {
        StepOutcome::Invalid(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field_name, "employers.0.name");
        }
        other => panic!("expected validation errors, got {:?}", other),
    }

    session.set_value("employers.0.name", json!("Acme")).unwrap();
    let mut received = None;
    session.submit(|payload| received = Some(payload.into_value())).unwrap();
    assert_eq!(received, Some(json!({ "employers": [{ "name": "Acme" }] })));
}

#[test]
fn test_hidden_required_field_is_not_validated() {
    let configuration = Arc::new(
        OnboardingConfiguration::new("pets", "Pets")
            .with_step(
                StepDefinition::new("household", "Household")
                    .with_field(FieldDefinition::new("hasPet", FieldKind::Checkbox))
                    .with_field(
                        FieldDefinition::new("petName", FieldKind::Text)
                            .with_order(1)
                            .required()
                            .with_visibility(VisibilityRule::new("hasPet", "equals", Some(json!(true)))),
                    ),
            )
            .with_step(
                StepDefinition::new("done", "Done")
                    .with_order(1)
                    .with_field(FieldDefinition::new("notes", FieldKind::Textarea)),
            ),
    );
    let mut session = FormSession::start(configuration).unwrap();

    assert!(matches!(session.next().unwrap(), StepOutcome::Moved { .. }));
    session.previous().unwrap();

    session.set_value("hasPet", json!(true)).unwrap();
    session.set_value("petName", json!("Rex")).unwrap();
    session.set_value("hasPet", json!(false)).unwrap();
    session.next().unwrap();

    let mut received = None;
    session.submit(|payload| received = Some(payload)).unwrap();
    let payload = received.unwrap();
    assert_eq!(payload.get("petName"), None);
    assert_eq!(payload.get("hasPet"), Some(&json!(false)));
}

#[test]
fn test_append_then_remove_restores_field_set() {
    let mut session = FormSession::start(employers_configuration()).unwrap();
    session.append_entry("employers").unwrap();
    let before = field_names(&mut session);

    let index = session.append_entry("employers").unwrap();
    assert_eq!(index, 1);
    assert_eq!(field_names(&mut session).len(), before.len() + 2);

    session.remove_entry("employers", index).unwrap();
    assert_eq!(field_names(&mut session), before);
}

#[test]
fn test_remove_reindexes_later_entries() {
    let mut session = FormSession::start(employers_configuration()).unwrap();
    for name in ["Acme", "Initech", "Globex"] {
        let index = session.append_entry("employers").unwrap();
        session.set_value(&format!("employers.{}.name", index), json!(name)).unwrap();
    }

    let removed = session.remove_entry("employers", 1).unwrap();
    assert_eq!(removed, json!({ "name": "Initech" }));
    assert_eq!(
        session.snapshot().get("employers"),
        Some(&json!([{ "name": "Acme" }, { "name": "Globex" }]))
    );
    assert_eq!(
        field_names(&mut session),
        vec!["employers", "employers.0", "employers.0.name", "employers.1", "employers.1.name"]
    );
    assert!(matches!(session.remove_entry("employers", 2), Err(CoreError::ArrayError(_))));
}

#[test]
fn test_only_leaves_and_scalar_entries_take_values() {
    let mut tags = FieldDefinition::new("tags", FieldKind::Array);
    tags.item_template = Some(Box::new(FieldDefinition::new("tag", FieldKind::Text)));
    let configuration = Arc::new(
        OnboardingConfiguration::new("tags", "Tags").with_step(StepDefinition::new("one", "One").with_field(tags)),
    );
    let mut session = FormSession::start(configuration).unwrap();
    session.append_entry("tags").unwrap();

    session.set_value("tags.0", json!(" rust ")).unwrap();
    assert_eq!(session.snapshot().get("tags"), Some(&json!(["rust"])));
    assert_eq!(
        session.set_value("tags", json!("rust")),
        Err(CoreError::ContainerField("tags".to_string()))
    );

    let mut employers = FormSession::start(employers_configuration()).unwrap();
    employers.append_entry("employers").unwrap();
    employers.set_value("employers.0.name", json!("Acme")).unwrap();
    assert!(matches!(
        employers.set_value("employers.0", json!("garbage")),
        Err(CoreError::ContainerField(_))
    ));
    assert_eq!(employers.snapshot().get("employers"), Some(&json!([{ "name": "Acme" }])));
}

#[test]
fn test_greater_than_never_fails() {
    let rule = VisibilityRule::new("age", "greaterThan", Some(json!(18)));
    let mut diagnostics = Diagnostics::new();

    for (age, expected) in [(json!(17), false), (json!(19), true), (json!("x"), false)] {
        let snapshot = DataSnapshot::from_value(json!({ "age": age })).unwrap();
        assert_eq!(evaluate(&rule, &snapshot, &mut diagnostics), expected, "age = {}", age);
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let configuration = visa_configuration();
    let snapshot = DataSnapshot::from_value(json!({ "hasPreviousVisas": true, "visaCountry": "FR" })).unwrap();
    let mut diagnostics = Diagnostics::new();

    let first = resolve_visible(&configuration, &snapshot, &mut diagnostics).step_keys().join(",");
    let second = resolve_visible(&configuration, &snapshot, &mut diagnostics).step_keys().join(",");
    assert_eq!(first, second);

    let payload = visible_payload(&configuration, &snapshot, &mut diagnostics);
    assert_eq!(payload, visible_payload(&configuration, &snapshot, &mut diagnostics));
    assert_eq!(snapshot.get("visaCountry"), Some(&json!("FR")));
}

#[test]
fn test_events_follow_the_session() {
    let mut session = FormSession::start(visa_configuration()).unwrap();
    session.next().unwrap();
    session.set_value("email", json!("al@example.com")).unwrap();
    session.submit(|_| {}).unwrap();

    let events: Vec<&str> = session.take_events().iter().map(|e| e.event_type()).collect();
    assert_eq!(events, vec!["session.started", "step.completed", "session.submitted"]);
    assert!(session.take_events().is_empty());
}
