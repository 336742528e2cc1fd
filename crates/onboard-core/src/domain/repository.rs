//! Collaborator traits for the onboarding runtime
//!
//! The runtime itself performs no I/O. Hosts implement these traits to load
//! configurations and persist session progress with whatever storage they
//! use; the in-memory versions under the `testing` feature back tests and
//! local previews.

use async_trait::async_trait;
use onboard_dsl::OnboardingConfiguration;

use super::progress::{SessionId, SessionProgress};
use crate::CoreError;

/// Source of onboarding configurations
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Load a configuration by id
    async fn load_configuration(&self, id: &str) -> Result<OnboardingConfiguration, CoreError>;

    /// Load the active configuration for a user type and organization type
    async fn load_active_configuration(
        &self,
        user_type: &str,
        org_type: &str,
    ) -> Result<OnboardingConfiguration, CoreError>;
}

/// Storage for in-flight session progress
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Save progress, replacing what was stored for the session
    async fn save_session_progress(
        &self,
        session_id: &SessionId,
        progress: &SessionProgress,
    ) -> Result<(), CoreError>;

    /// Load progress for a session
    async fn load_session_progress(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionProgress>, CoreError>;
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    /// In-memory configuration source keyed by configuration id
    pub struct MemoryConfigurationSource {
        configurations: Arc<DashMap<String, OnboardingConfiguration>>,
    }

    impl MemoryConfigurationSource {
        /// Create an empty source
        pub fn new() -> Self {
            Self {
                configurations: Arc::new(DashMap::with_capacity(8)),
            }
        }

        /// Add or replace a configuration.
        ///
        /// Activating a configuration deactivates any other active one for
        /// the same user type and organization type.
        pub fn insert(&self, configuration: OnboardingConfiguration) {
            if configuration.is_active {
                for mut entry in self.configurations.iter_mut() {
                    let other = entry.value_mut();
                    if other.id != configuration.id
                        && other.target_user_type == configuration.target_user_type
                        && other.target_org_type == configuration.target_org_type
                    {
                        other.is_active = false;
                    }
                }
            }
            self.configurations.insert(configuration.id.clone(), configuration);
        }
    }

    impl Default for MemoryConfigurationSource {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ConfigurationSource for MemoryConfigurationSource {
        async fn load_configuration(&self, id: &str) -> Result<OnboardingConfiguration, CoreError> {
            self.configurations
                .get(id)
                .map(|c| c.clone())
                .ok_or_else(|| CoreError::ConfigurationNotFound(id.to_string()))
        }

        async fn load_active_configuration(
            &self,
            user_type: &str,
            org_type: &str,
        ) -> Result<OnboardingConfiguration, CoreError> {
            self.configurations
                .iter()
                .find(|c| c.is_active && c.target_user_type == user_type && c.target_org_type == org_type)
                .map(|c| c.clone())
                .ok_or_else(|| {
                    CoreError::ConfigurationNotFound(format!("no active configuration for {}/{}", user_type, org_type))
                })
        }
    }

    /// In-memory session progress store
    pub struct MemorySessionRepository {
        sessions: Arc<DashMap<String, SessionProgress>>,
    }

    impl MemorySessionRepository {
        /// Create an empty store
        pub fn new() -> Self {
            Self {
                sessions: Arc::new(DashMap::with_capacity(64)),
            }
        }

        /// Number of stored sessions
        pub fn len(&self) -> usize {
            self.sessions.len()
        }

        pub fn is_empty(&self) -> bool {
            self.sessions.is_empty()
        }
    }

    impl Default for MemorySessionRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SessionRepository for MemorySessionRepository {
        async fn save_session_progress(
            &self,
            session_id: &SessionId,
            progress: &SessionProgress,
        ) -> Result<(), CoreError> {
            self.sessions.insert(session_id.0.clone(), progress.clone());
            Ok(())
        }

        async fn load_session_progress(
            &self,
            session_id: &SessionId,
        ) -> Result<Option<SessionProgress>, CoreError> {
            Ok(self.sessions.get(&session_id.0).map(|p| p.clone()))
        }
    }
}

#[cfg(all(test, feature = "testing"))]
mod tests {
    use super::memory::*;
    use super::*;

    fn configuration(id: &str, active: bool) -> OnboardingConfiguration {
        let mut configuration = OnboardingConfiguration::new(id, id);
        configuration.target_user_type = "applicant".to_string();
        configuration.target_org_type = "consulate".to_string();
        configuration.is_active = active;
        configuration
    }

    #[tokio::test]
    async fn test_single_active_configuration() {
        let source = MemoryConfigurationSource::new();
        source.insert(configuration("v1", true));
        source.insert(configuration("v2", true));

        let active = source.load_active_configuration("applicant", "consulate").await.unwrap();
        assert_eq!(active.id, "v2");
        assert!(!source.load_configuration("v1").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_missing_configuration() {
        let source = MemoryConfigurationSource::new();
        let err = source.load_configuration("nope").await.unwrap_err();
        assert_eq!(err, CoreError::ConfigurationNotFound("nope".to_string()));
        assert!(source.load_active_configuration("a", "b").await.is_err());
    }
}
