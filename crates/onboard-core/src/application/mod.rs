/// Form session runtime
pub mod session;

/// Session service composing the collaborators
pub mod session_service;

/// Widget bindings and the kind registry
pub mod widgets;
