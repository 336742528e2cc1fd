//! The form session runtime: one user's pass through a pinned configuration.
//!
//! A [`FormSession`] owns the data snapshot and the navigation state. Every
//! mutation is followed by visibility resolution and error refresh before
//! the method returns, so the next render or navigation decision always
//! sees a consistent state.

use chrono::{DateTime, Utc};
use onboard_dsl::{
    model::walk_fields, utils::path, validate_configuration, EntryTemplate, FieldDefinition,
    FieldKind, FieldNode, OnboardingConfiguration, StepDefinition,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::widgets::{ArrayControls, WidgetBinding};
use crate::config::EngineConfig;
use crate::domain::{
    events::{DomainEvent, SessionStarted, SessionSubmitted, StepCompleted},
    expander,
    field_rules::{validate_field, CustomRuleRegistry, FieldError, RuleContext},
    navigator::{self, NavigationAction, NavigationContext, NavigatorState, Transition},
    progress::{SessionId, SessionProgress},
    rule::Diagnostics,
    visibility,
};
use crate::error::CoreError;
use crate::types::DataSnapshot;

/// Collaborators and settings a session is created with
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub engine: EngineConfig,
    pub custom_rules: CustomRuleRegistry,
}

/// What a navigation request led to
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The session is now on this step
    Moved { step_key: String, step_index: usize },
    /// Validation failed; the session stayed where it was
    Invalid(Vec<FieldError>),
    /// The payload was handed to the host
    Submitted,
}

/// A running form session
pub struct FormSession {
    id: SessionId,
    configuration: Arc<OnboardingConfiguration>,
    options: SessionOptions,
    snapshot: DataSnapshot,
    navigation: NavigatorState,
    errors: BTreeMap<String, FieldError>,
    diagnostics: Diagnostics,
    events: Vec<Box<dyn DomainEvent>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("id", &self.id)
            .field("configuration_id", &self.configuration.id)
            .field("config_version", &self.configuration.version)
            .field("navigation", &self.navigation)
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl FormSession {
    /// Start a session with default options
    pub fn start(configuration: Arc<OnboardingConfiguration>) -> Result<Self, CoreError> {
        Self::start_with(configuration, SessionOptions::default())
    }

    /// Start a session on a configuration.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] when the configuration fails
    /// validation or nests deeper than the engine allows.
    pub fn start_with(configuration: Arc<OnboardingConfiguration>, options: SessionOptions) -> Result<Self, CoreError> {
        Self::check_configuration(&configuration, &options.engine)?;

        let now = Utc::now();
        let mut session = Self {
            id: SessionId::generate(),
            configuration,
            options,
            snapshot: DataSnapshot::new(),
            navigation: NavigatorState::default(),
            errors: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
            events: Vec::with_capacity(8),
            created_at: now,
            updated_at: now,
        };
        session.navigation = {
            let mut ctx = NavigationContext {
                configuration: &session.configuration,
                snapshot: &session.snapshot,
                custom_rules: &session.options.custom_rules,
                diagnostics: &mut session.diagnostics,
            };
            navigator::initial_state(&mut ctx)
        };
        session.record_started(false);

        info!(
            session_id = %session.id,
            configuration_id = %session.configuration.id,
            config_version = session.configuration.version,
            "Form session started"
        );
        Ok(session)
    }

    /// Continue a session from persisted progress.
    ///
    /// # Errors
    ///
    /// * [`CoreError::VersionMismatch`] when the progress was recorded on
    ///   another configuration version
    /// * [`CoreError::InvalidConfiguration`] when the progress belongs to
    ///   another configuration or the configuration is invalid
    pub fn resume(
        configuration: Arc<OnboardingConfiguration>,
        progress: SessionProgress,
        options: SessionOptions,
    ) -> Result<Self, CoreError> {
        if progress.configuration_id != configuration.id {
            return Err(CoreError::InvalidConfiguration(format!(
                "session {} belongs to configuration '{}', not '{}'",
                progress.session_id, progress.configuration_id, configuration.id
            )));
        }
        if progress.config_version != configuration.version {
            return Err(CoreError::VersionMismatch {
                pinned: progress.config_version,
                current: configuration.version,
            });
        }
        Self::check_configuration(&configuration, &options.engine)?;

        let mut session = Self {
            id: progress.session_id,
            configuration,
            options,
            snapshot: progress.data_snapshot,
            navigation: progress.navigation,
            errors: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
            events: Vec::with_capacity(8),
            created_at: progress.created_at,
            updated_at: progress.updated_at,
        };
        session.realign();
        session.record_started(true);

        info!(
            session_id = %session.id,
            step = %session.navigation.current_step_key,
            "Form session resumed"
        );
        Ok(session)
    }

    fn check_configuration(configuration: &OnboardingConfiguration, engine: &EngineConfig) -> Result<(), CoreError> {
        validate_configuration(configuration)?;

        let mut deepest = 0;
        for step in &configuration.steps {
            walk_fields(&step.fields, "", &mut |_node: FieldNode<'_>, _path: &str, depth: usize| {
                deepest = deepest.max(depth);
                true
            });
        }
        if deepest > engine.max_nesting_depth {
            return Err(CoreError::InvalidConfiguration(format!(
                "fields nest {} levels deep, the limit is {}",
                deepest, engine.max_nesting_depth
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn configuration(&self) -> &Arc<OnboardingConfiguration> {
        &self.configuration
    }

    pub fn snapshot(&self) -> &DataSnapshot {
        &self.snapshot
    }

    pub fn navigation(&self) -> &NavigatorState {
        &self.navigation
    }

    /// Index of the current step among the visible steps
    pub fn current_step_index(&self) -> usize {
        self.navigation.current_step_index
    }

    pub fn current_step(&self) -> Option<&StepDefinition> {
        self.configuration.step(&self.navigation.current_step_key)
    }

    pub fn is_submitted(&self) -> bool {
        self.navigation.submitted
    }

    /// Current per-field errors keyed by materialized path
    pub fn errors(&self) -> &BTreeMap<String, FieldError> {
        &self.errors
    }

    pub fn error_for(&self, field_name: &str) -> Option<&FieldError> {
        self.errors.get(field_name)
    }

    /// Problems found while interpreting the configuration
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Keys of the currently visible steps, in order
    pub fn visible_step_keys(&mut self) -> Vec<String> {
        visibility::resolve_visible(&self.configuration, &self.snapshot, &mut self.diagnostics)
            .step_keys()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Write a value at a materialized field path.
    ///
    /// # Errors
    ///
    /// * [`CoreError::UnknownField`] for a path that no declared field
    ///   materializes to, or an entry index past the end of its array
    /// * [`CoreError::ContainerField`] for a group, an array or an object
    ///   entry; those change through their leaves and the entry operations
    /// * [`CoreError::AlreadySubmitted`] after submission
    pub fn set_value(&mut self, field_name: &str, value: Value) -> Result<(), CoreError> {
        self.ensure_open()?;
        let field = self
            .field_for_path(field_name)
            .ok_or_else(|| CoreError::UnknownField(field_name.to_string()))?;
        if field.kind.is_container() {
            return Err(CoreError::ContainerField(field_name.to_string()));
        }
        self.check_entry_indices(field_name)?;

        let value = match value {
            Value::String(text) if self.options.engine.trim_text_values && field.kind.is_text_like() => {
                Value::String(text.trim().to_string())
            }
            other => other,
        };

        self.snapshot.set(field_name, value)?;
        debug!(session_id = %self.id, field = %field_name, "Value set");
        self.after_mutation();
        Ok(())
    }

    /// Append a seeded entry to an array field; returns the new index
    pub fn append_entry(&mut self, array_path: &str) -> Result<usize, CoreError> {
        self.ensure_open()?;
        let field = self.array_field(array_path)?;
        self.check_entry_indices(array_path)?;

        let index = expander::append_entry(&mut self.snapshot, &field, array_path)?;
        self.after_mutation();
        Ok(index)
    }

    /// Remove entry `index` of an array field.
    ///
    /// Later entries shift down by one; errors recorded anywhere under the
    /// array are dropped rather than remapped.
    pub fn remove_entry(&mut self, array_path: &str, index: usize) -> Result<Value, CoreError> {
        self.ensure_open()?;
        let field = self.array_field(array_path)?;
        self.check_entry_indices(array_path)?;

        let removed = expander::remove_entry(&mut self.snapshot, &field, array_path, index)?;
        self.errors.retain(|key, _| !path::is_within(key, array_path));
        self.after_mutation();
        Ok(removed)
    }

    /// Validate the current step and advance when it passes
    pub fn next(&mut self) -> Result<StepOutcome, CoreError> {
        let before = self.navigation.completed_step_keys.clone();
        let transition = self.navigate(NavigationAction::Next)?;

        match transition {
            Transition::Blocked { state, errors } => Ok(self.block(state, errors)),
            other => {
                self.navigation = other.into_state();
                let newly_completed: Vec<String> = self
                    .navigation
                    .completed_step_keys
                    .iter()
                    .filter(|key| !before.contains(key))
                    .cloned()
                    .collect();
                for key in newly_completed {
                    self.drop_step_errors(&key);
                    self.events.push(Box::new(StepCompleted {
                        session_id: self.id.clone(),
                        step_key: key,
                        timestamp: Utc::now(),
                    }));
                }
                Ok(self.moved())
            }
        }
    }

    /// Go back one step without validating
    pub fn previous(&mut self) -> Result<StepOutcome, CoreError> {
        let transition = self.navigate(NavigationAction::Previous)?;
        self.navigation = transition.into_state();
        Ok(self.moved())
    }

    /// Jump to a visible step the user already reached
    pub fn jump_to(&mut self, index: usize) -> Result<StepOutcome, CoreError> {
        let transition = self.navigate(NavigationAction::JumpTo(index))?;
        self.navigation = transition.into_state();
        Ok(self.moved())
    }

    /// Validate everything visible and hand the payload to `on_submit`.
    ///
    /// `on_submit` runs at most once per session; a later call fails with
    /// [`CoreError::AlreadySubmitted`].
    pub fn submit<F>(&mut self, on_submit: F) -> Result<StepOutcome, CoreError>
    where
        F: FnOnce(DataSnapshot),
    {
        self.try_submit(|payload| {
            on_submit(payload);
            Ok(())
        })
    }

    /// Like [`FormSession::submit`] for hosts whose hand-off can fail.
    ///
    /// When `on_submit` fails the session stays unsubmitted with its data
    /// intact, so the host can retry.
    pub fn try_submit<F>(&mut self, on_submit: F) -> Result<StepOutcome, CoreError>
    where
        F: FnOnce(DataSnapshot) -> Result<(), CoreError>,
    {
        match self.navigate(NavigationAction::Submit)? {
            Transition::Blocked { state, errors } => Ok(self.block(state, errors)),
            Transition::ReadyToSubmit { state, payload } => {
                let field_count = payload.as_map().len();
                if let Err(e) = on_submit(payload) {
                    warn!(session_id = %self.id, error = %e, "Submission hand-off failed");
                    return Err(e);
                }

                self.navigation = state;
                self.errors.clear();
                self.touch();
                self.events.push(Box::new(SessionSubmitted {
                    session_id: self.id.clone(),
                    field_count,
                    timestamp: Utc::now(),
                }));
                info!(session_id = %self.id, "Form session submitted");
                Ok(StepOutcome::Submitted)
            }
            Transition::Moved(state) => {
                self.navigation = state;
                Ok(self.moved())
            }
        }
    }

    /// Validate the current step without navigating; records the errors
    pub fn validate_current_step(&mut self) -> Vec<FieldError> {
        let Some(step) = self.configuration.step(&self.navigation.current_step_key) else {
            return Vec::new();
        };
        let mut ctx = NavigationContext {
            configuration: &self.configuration,
            snapshot: &self.snapshot,
            custom_rules: &self.options.custom_rules,
            diagnostics: &mut self.diagnostics,
        };
        let errors = navigator::validate_step(step, &mut ctx);
        let key = step.key.clone();
        self.drop_step_errors(&key);
        self.errors
            .extend(errors.iter().map(|e| (e.field_name.clone(), e.clone())));
        errors
    }

    /// Bindings for every visible materialized field of the current step
    pub fn widgets(&mut self) -> Vec<WidgetBinding> {
        let Some(step) = self.configuration.step(&self.navigation.current_step_key) else {
            return Vec::new();
        };

        visibility::materialize_step(step, &self.snapshot, &mut self.diagnostics)
            .into_iter()
            .map(|field| {
                let current_value = self
                    .snapshot
                    .get(&field.field_name)
                    .cloned()
                    .unwrap_or_else(|| expander::empty_value(&field));
                let controls = (field.kind == FieldKind::Array).then(|| {
                    let len = self.snapshot.array_len(&field.field_name);
                    ArrayControls {
                        len,
                        can_add: expander::can_add(&field, len),
                        can_remove: expander::can_remove(&field, len),
                    }
                });
                WidgetBinding {
                    error_message: self.errors.get(&field.field_name).map(|e| e.message.clone()),
                    current_value,
                    controls,
                    is_required: field.is_required,
                    kind: field.kind,
                    options: field.options,
                    help_text: field.help_text,
                    label: field.label,
                    placeholder: field.placeholder,
                    field_name: field.field_name,
                }
            })
            .collect()
    }

    /// The payload a submission would send right now
    pub fn visible_payload(&mut self) -> DataSnapshot {
        visibility::visible_payload(&self.configuration, &self.snapshot, &mut self.diagnostics)
    }

    /// Persistable progress
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            session_id: self.id.clone(),
            configuration_id: self.configuration.id.clone(),
            config_version: self.configuration.version,
            data_snapshot: self.snapshot.clone(),
            navigation: self.navigation.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Drain the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }

    fn navigate(&mut self, action: NavigationAction) -> Result<Transition, CoreError> {
        let mut ctx = NavigationContext {
            configuration: &self.configuration,
            snapshot: &self.snapshot,
            custom_rules: &self.options.custom_rules,
            diagnostics: &mut self.diagnostics,
        };
        let result = navigator::transition(&self.navigation, action, &mut ctx);
        if let Err(e) = &result {
            debug!(session_id = %self.id, ?action, error = %e, "Navigation refused");
        }
        result
    }

    fn block(&mut self, state: NavigatorState, errors: Vec<FieldError>) -> StepOutcome {
        self.navigation = state;
        self.errors = errors
            .iter()
            .map(|e| (e.field_name.clone(), e.clone()))
            .collect();
        debug!(session_id = %self.id, errors = errors.len(), "Validation blocked navigation");
        StepOutcome::Invalid(errors)
    }

    fn moved(&mut self) -> StepOutcome {
        self.touch();
        StepOutcome::Moved {
            step_key: self.navigation.current_step_key.clone(),
            step_index: self.navigation.current_step_index,
        }
    }

    fn record_started(&mut self, resumed: bool) {
        self.events.push(Box::new(SessionStarted {
            session_id: self.id.clone(),
            configuration_id: self.configuration.id.clone(),
            config_version: self.configuration.version,
            resumed,
            timestamp: Utc::now(),
        }));
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.navigation.submitted {
            Err(CoreError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Visibility may have changed: realign the current step and refresh
    /// the errors still on display.
    fn after_mutation(&mut self) {
        self.touch();
        self.realign();
        self.refresh_errors();
    }

    fn realign(&mut self) {
        let mut ctx = NavigationContext {
            configuration: &self.configuration,
            snapshot: &self.snapshot,
            custom_rules: &self.options.custom_rules,
            diagnostics: &mut self.diagnostics,
        };
        self.navigation = navigator::realign(&self.navigation, &mut ctx);
    }

    /// Re-check fields that currently show an error; hidden fields lose theirs
    fn refresh_errors(&mut self) {
        if self.errors.is_empty() {
            return;
        }

        let mut visible: BTreeMap<String, FieldDefinition> = BTreeMap::new();
        let steps = visibility::resolve_visible(&self.configuration, &self.snapshot, &mut self.diagnostics).steps;
        for step in steps {
            for field in visibility::materialize_step(step, &self.snapshot, &mut self.diagnostics) {
                if self.errors.contains_key(&field.field_name) {
                    visible.insert(field.field_name.clone(), field);
                }
            }
        }

        let snapshot = &self.snapshot;
        let mut ctx = RuleContext {
            snapshot,
            custom_rules: &self.options.custom_rules,
            diagnostics: &mut self.diagnostics,
        };
        self.errors = visible
            .values()
            .filter_map(|field| validate_field(field, &field.field_name, snapshot.get(&field.field_name), &mut ctx))
            .map(|e| (e.field_name.clone(), e))
            .collect();
    }

    fn drop_step_errors(&mut self, step_key: &str) {
        let configuration = Arc::clone(&self.configuration);
        self.errors.retain(|key, _| {
            visibility::owning_step(&configuration, key).map_or(true, |step| step.key != step_key)
        });
    }

    /// The declared field a materialized path resolves to; a scalar array
    /// entry resolves to the array's item template.
    fn field_for_path(&self, field_name: &str) -> Option<FieldDefinition> {
        if !path::is_valid_field_path(field_name) {
            return None;
        }
        let declared = visibility::declared_field(&self.configuration, &path::template_path(field_name))?;
        let ends_with_index = field_name
            .rsplit('.')
            .next()
            .map_or(false, path::is_index_segment);

        match (declared.entry_template(), ends_with_index && declared.kind == FieldKind::Array) {
            (EntryTemplate::Scalar(template), true) => Some(template.clone()),
            _ => Some(declared.clone()),
        }
    }

    fn array_field(&self, array_path: &str) -> Result<FieldDefinition, CoreError> {
        let field = self
            .field_for_path(array_path)
            .ok_or_else(|| CoreError::UnknownField(array_path.to_string()))?;
        if field.kind != FieldKind::Array {
            return Err(CoreError::ArrayError(format!("'{}' is not an array field", array_path)));
        }
        Ok(field)
    }

    /// Every index segment must address an existing entry
    fn check_entry_indices(&self, field_name: &str) -> Result<(), CoreError> {
        let segments: Vec<&str> = field_name.split('.').collect();
        for (position, segment) in segments.iter().enumerate() {
            if !path::is_index_segment(segment) {
                continue;
            }
            let array_path = segments[..position].join(".");
            let index: usize = segment
                .parse()
                .map_err(|_| CoreError::UnknownField(field_name.to_string()))?;
            if index >= self.snapshot.array_len(&array_path) {
                return Err(CoreError::UnknownField(field_name.to_string()));
            }
        }
        Ok(())
    }
}
