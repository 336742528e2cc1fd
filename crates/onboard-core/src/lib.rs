//!
//! Onboard Core - Runtime interpreter for onboarding configurations
//!
//! This crate turns an [`onboard_dsl::OnboardingConfiguration`] into a
//! running multi-step form: it evaluates visibility rules, expands
//! repeatable arrays into concretely named fields, validates field values
//! and drives step navigation up to a single submission.
//!
//! ```
//! use std::sync::Arc;
//! use onboard_core::{FormSession, StepOutcome};
//! use onboard_dsl::{FieldDefinition, FieldKind, OnboardingConfiguration, RuleKind, StepDefinition, ValidationRule};
//! use serde_json::json;
//!
//! let configuration = OnboardingConfiguration::new("profile", "Profile").with_step(
//!     StepDefinition::new("about", "About").with_field(
//!         FieldDefinition::new("name", FieldKind::Text)
//!             .required()
//!             .with_rule(ValidationRule::new(RuleKind::MinLength, Some(json!(2)))),
//!     ),
//! );
//!
//! let mut session = FormSession::start(Arc::new(configuration)).unwrap();
//! session.set_value("name", json!("Al")).unwrap();
//!
//! let mut received = None;
//! let outcome = session.submit(|payload| received = Some(payload.into_value())).unwrap();
//!
//! assert_eq!(outcome, StepOutcome::Submitted);
//! assert_eq!(received, Some(json!({ "name": "Al" })));
//! ```

#![forbid(unsafe_code)]

/// Domain layer - rules, visibility, repeaters and navigation
pub mod domain;

/// Application services - sessions and widget bindings
pub mod application;

/// Engine configuration
pub mod config;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use config::EngineConfig;
pub use error::CoreError;
pub use types::DataSnapshot;

pub use application::session::{FormSession, SessionOptions, StepOutcome};
pub use application::session_service::SessionService;
pub use application::widgets::{ArrayControls, WidgetBinding, WidgetRegistry};

pub use domain::events::DomainEvent;
pub use domain::field_rules::{CustomRuleRegistry, FieldError};
pub use domain::navigator::{NavigationAction, NavigatorState, Transition};
pub use domain::progress::{SessionId, SessionProgress};
pub use domain::repository::{ConfigurationSource, SessionRepository};
pub use domain::rule::{evaluate, Diagnostic, Diagnostics};
pub use domain::visibility::{resolve_visible, ResolvedVisibility};

/// Version of the runtime
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
