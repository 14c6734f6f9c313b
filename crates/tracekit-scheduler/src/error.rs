//! Error types for the task scheduler.

use thiserror::Error;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The poll thread could not be spawned.
    #[error("Failed to spawn scheduler poll thread: {0}")]
    SpawnFailed(String),
}

impl SchedulerError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

/// A specialized `Result` type for scheduler operations.
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
