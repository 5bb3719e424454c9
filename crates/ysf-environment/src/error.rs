//! Error types for environments.

use thiserror::Error;

/// Environment-specific errors.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// No environment was given and none matches the current route.
    #[error("no environment matches the current route")]
    NoEnvironment,

    /// Configuration or session data could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for environment operations.
pub type Result<T> = std::result::Result<T, EnvironmentError>;
