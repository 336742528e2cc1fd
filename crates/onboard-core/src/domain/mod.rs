/// Visibility rule evaluation and diagnostics
pub mod rule;

/// Per-field validation rules
pub mod field_rules;

/// Repeater (array field) expansion
pub mod expander;

/// Visibility resolution and field materialization
pub mod visibility;

/// Step navigation state machine
pub mod navigator;

/// Persisted session progress
pub mod progress;

/// Domain events
pub mod events;

/// Repository interfaces
pub mod repository;
