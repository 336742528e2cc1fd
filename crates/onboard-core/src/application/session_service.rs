use crate::{
    application::session::{FormSession, SessionOptions},
    domain::progress::SessionId,
    domain::repository::{ConfigurationSource, SessionRepository},
    CoreError,
};
use onboard_monitoring::LogExt;
use std::sync::Arc;
use tracing::info;

/// Service wiring form sessions to the host's configuration source and
/// progress store
pub struct SessionService {
    /// Source of configurations
    configurations: Arc<dyn ConfigurationSource>,

    /// Store for session progress
    sessions: Arc<dyn SessionRepository>,

    /// Options every session is created with
    options: SessionOptions,
}

impl SessionService {
    /// Create a new session service with default options
    pub fn new(configurations: Arc<dyn ConfigurationSource>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self::with_options(configurations, sessions, SessionOptions::default())
    }

    pub fn with_options(
        configurations: Arc<dyn ConfigurationSource>,
        sessions: Arc<dyn SessionRepository>,
        options: SessionOptions,
    ) -> Self {
        Self {
            configurations,
            sessions,
            options,
        }
    }

    /// Start a session on a configuration by id
    pub async fn start_session(&self, configuration_id: &str) -> Result<FormSession, CoreError> {
        let configuration = self.configurations.load_configuration(configuration_id).await?;
        FormSession::start_with(Arc::new(configuration), self.options.clone())
    }

    /// Start a session on the active configuration for a user and org type
    pub async fn start_active_session(&self, user_type: &str, org_type: &str) -> Result<FormSession, CoreError> {
        let configuration = self
            .configurations
            .load_active_configuration(user_type, org_type)
            .await?;
        info!(
            user_type = %user_type,
            org_type = %org_type,
            configuration_id = %configuration.id,
            "Resolved active configuration"
        );
        FormSession::start_with(Arc::new(configuration), self.options.clone())
    }

    /// Persist a session's progress.
    ///
    /// Failures are returned as-is; the session keeps its in-memory state
    /// so the host can retry.
    pub async fn save_progress(&self, session: &FormSession) -> Result<(), CoreError> {
        let progress = session.progress();
        self.sessions
            .save_session_progress(session.id(), &progress)
            .await
            .log_err("Failed to save session progress")
    }

    /// Resume a persisted session.
    ///
    /// # Errors
    ///
    /// * [`CoreError::SessionNotFound`] when nothing was saved for the id
    /// * [`CoreError::VersionMismatch`] when the configuration moved on
    pub async fn resume_session(&self, session_id: &SessionId) -> Result<FormSession, CoreError> {
        let progress = self
            .sessions
            .load_session_progress(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let configuration = self
            .configurations
            .load_configuration(&progress.configuration_id)
            .await?;

        FormSession::resume(Arc::new(configuration), progress, self.options.clone())
    }
}
