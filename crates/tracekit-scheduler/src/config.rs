//! Scheduler configuration.

use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Task scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Sleep between poll rounds while no task is due. Due tasks are
    /// dispatched back to back without sleeping, and adds wake the poll
    /// thread early, so this only bounds idle-loop latency.
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl SchedulerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval is zero.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.poll_interval.is_zero() {
            return Err(SchedulerError::invalid_configuration(
                "poll_interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = SchedulerConfig {
            poll_interval: Duration::ZERO,
        };
        assert!(config.validate().is_err());
    }
}
