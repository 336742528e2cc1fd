use crate::domain::progress::SessionId;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Domain event trait for all events recorded by a form session
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the session this event is associated with
    fn session_id(&self) -> &SessionId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Event: Session started or resumed on a pinned configuration version
#[derive(Debug)]
pub struct SessionStarted {
    /// The session
    pub session_id: SessionId,

    /// The configuration being filled in
    pub configuration_id: String,

    /// The version the session is pinned to
    pub config_version: u64,

    /// Whether the session continues persisted progress
    pub resumed: bool,

    /// The timestamp when the session started
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for SessionStarted {
    fn event_type(&self) -> &'static str {
        if self.resumed {
            "session.resumed"
        } else {
            "session.started"
        }
    }

    fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: A step passed validation
#[derive(Debug)]
pub struct StepCompleted {
    /// The session
    pub session_id: SessionId,
    /// Key of the completed step
    pub step_key: String,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for StepCompleted {
    fn event_type(&self) -> &'static str {
        "step.completed"
    }

    fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: The final payload was handed to the host
#[derive(Debug)]
pub struct SessionSubmitted {
    /// The session
    pub session_id: SessionId,
    /// Number of top-level values in the submitted payload
    pub field_count: usize,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for SessionSubmitted {
    fn event_type(&self) -> &'static str {
        "session.submitted"
    }

    fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
