//! Error types for the trace collector.

use thiserror::Error;

/// Errors that can occur during collector operations.
///
/// Capacity exhaustion is deliberately absent: overflow is recovered
/// automatically and surfaced as annotated messages, never as an error.
#[derive(Debug, Clone, Error)]
pub enum CollectorError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Listener id was not registered (or was already removed).
    #[error("Unknown listener: {0}")]
    UnknownListener(u64),

    /// The drain timer thread could not be spawned.
    #[error("Failed to spawn drain timer thread: {0}")]
    SpawnFailed(String),
}

impl CollectorError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

/// A specialized `Result` type for collector operations.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_reason() {
        let err = CollectorError::invalid_configuration("max_queue must be > 0");
        assert!(err.to_string().contains("max_queue"));
        assert!(matches!(err, CollectorError::InvalidConfiguration(_)));
    }
}
