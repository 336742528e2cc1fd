use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::navigator::NavigatorState;
use crate::types::DataSnapshot;

/// Value object: Session ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// A fresh random (v4) session id
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId(id.to_string())
    }
}

/// Everything needed to resume a session later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub session_id: SessionId,

    pub configuration_id: String,

    /// Configuration version the session is pinned to
    pub config_version: u64,

    pub data_snapshot: DataSnapshot,

    /// Current step and completed steps
    #[serde(flatten)]
    pub navigation: NavigatorState,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl SessionProgress {
    #[inline]
    pub fn current_step_index(&self) -> usize {
        self.navigation.current_step_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persisted_shape() {
        let now = Utc::now();
        let progress = SessionProgress {
            session_id: SessionId::from("s1"),
            configuration_id: "visa".to_string(),
            config_version: 2,
            data_snapshot: DataSnapshot::from_value(json!({ "name": "Al" })).unwrap(),
            navigation: NavigatorState {
                current_step_key: "contact".to_string(),
                current_step_index: 1,
                completed_step_keys: vec!["history".to_string()],
                submitted: false,
            },
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["sessionId"], json!("s1"));
        assert_eq!(value["dataSnapshot"], json!({ "name": "Al" }));
        assert_eq!(value["currentStepIndex"], json!(1));
        assert_eq!(value["completedStepKeys"], json!(["history"]));

        let back: SessionProgress = serde_json::from_value(value).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
