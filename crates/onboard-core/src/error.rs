use thiserror::Error;

/// Core error type for the onboarding runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Configuration not found by the configuration source
    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    /// Configuration failed eager validation; the session refuses to start
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Persisted session progress not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Persisted progress was recorded against another configuration version
    #[error("Configuration version mismatch: session pinned to {pinned}, configuration is at {current}")]
    VersionMismatch {
        /// Version the session was started on
        pinned: u64,
        /// Version offered now
        current: u64,
    },

    /// A navigation action not allowed from the current state
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// Submit was attempted after a successful submission
    #[error("Session already submitted")]
    AlreadySubmitted,

    /// A repeater operation outside its bounds or on a non-array field
    #[error("Array error: {0}")]
    ArrayError(String),

    /// A path that does not address a materialized field
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A group, an array or an object entry was written as a single value
    #[error("Field '{0}' holds other fields; set its children instead")]
    ContainerField(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Engine configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::ConfigurationNotFound(_) => "ERR_CORE_CONFIGURATION_NOT_FOUND",
            CoreError::InvalidConfiguration(_) => "ERR_CORE_INVALID_CONFIGURATION",
            CoreError::SessionNotFound(_) => "ERR_CORE_SESSION_NOT_FOUND",
            CoreError::VersionMismatch { .. } => "ERR_CORE_VERSION_MISMATCH",
            CoreError::NavigationError(_) => "ERR_CORE_NAVIGATION",
            CoreError::AlreadySubmitted => "ERR_CORE_ALREADY_SUBMITTED",
            CoreError::ArrayError(_) => "ERR_CORE_ARRAY",
            CoreError::UnknownField(_) => "ERR_CORE_UNKNOWN_FIELD",
            CoreError::ContainerField(_) => "ERR_CORE_CONTAINER_FIELD",
            CoreError::StateStoreError(_) => "ERR_CORE_STATE_STORE",
            CoreError::IOError(_) => "ERR_CORE_IO",
            CoreError::SerializationError(_) => "ERR_CORE_SERIALIZATION",
            CoreError::ConfigurationError(_) => "ERR_CORE_CONFIG",
            CoreError::Other(_) => "ERR_CORE_OTHER",
        }
    }
}

impl From<onboard_dsl::DslError> for CoreError {
    fn from(err: onboard_dsl::DslError) -> Self {
        CoreError::InvalidConfiguration(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::IOError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
