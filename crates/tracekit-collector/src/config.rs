//! Collector configuration.

use crate::error::{CollectorError, CollectorResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trace collector configuration.
///
/// `max_queue` bounds the ingestion queue that producers write into;
/// `max_retained` bounds the longer-lived buffer snapshots are served from
/// and must be at least as large.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Steady-state interval between drain cycles.
    pub drain_interval: Duration,
    /// Delay before the first drain cycle after startup (or restart).
    pub startup_delay: Duration,
    /// Ingestion queue bound; the oldest entry is dropped on overflow.
    pub max_queue: usize,
    /// Retained buffer bound; the oldest entry is evicted on overflow.
    pub max_retained: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_millis(100),
            startup_delay: Duration::from_millis(10),
            max_queue: 333,
            max_retained: 1000,
        }
    }
}

impl CollectorConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any bound is zero, the retained bound is smaller
    /// than the queue bound, or the drain interval is zero.
    pub fn validate(&self) -> CollectorResult<()> {
        if self.drain_interval.is_zero() {
            return Err(CollectorError::invalid_configuration(
                "drain_interval must be greater than 0",
            ));
        }
        if self.max_queue == 0 {
            return Err(CollectorError::invalid_configuration(
                "max_queue must be greater than 0",
            ));
        }
        if self.max_retained < self.max_queue {
            return Err(CollectorError::invalid_configuration(format!(
                "max_retained {} must be greater or equal max_queue {}",
                self.max_retained, self.max_queue
            )));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }
}

/// Builder for [`CollectorConfig`].
#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Set the steady-state drain interval.
    #[must_use]
    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config.drain_interval = interval;
        self
    }

    /// Set the delay before the first drain cycle.
    #[must_use]
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.config.startup_delay = delay;
        self
    }

    /// Set the ingestion queue bound.
    #[must_use]
    pub fn max_queue(mut self, bound: usize) -> Self {
        self.config.max_queue = bound;
        self
    }

    /// Set the retained buffer bound.
    #[must_use]
    pub fn max_retained(mut self, bound: usize) -> Self {
        self.config.max_retained = bound;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> CollectorResult<CollectorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CollectorConfig::default().validate().is_ok());
    }

    #[test]
    fn retained_must_cover_queue() {
        let config = CollectorConfig {
            max_queue: 100,
            max_retained: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_round_trip() {
        let config = CollectorConfig::builder()
            .drain_interval(Duration::from_millis(20))
            .startup_delay(Duration::from_millis(1))
            .max_queue(10)
            .max_retained(40)
            .build()
            .unwrap();
        assert_eq!(config.max_queue, 10);
        assert_eq!(config.max_retained, 40);
        assert_eq!(config.drain_interval, Duration::from_millis(20));
    }

    #[test]
    fn zero_interval_rejected() {
        let result = CollectorConfig::builder()
            .drain_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }
}
