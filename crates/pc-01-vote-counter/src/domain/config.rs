//! Counter configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use pc_01_vote_counter::domain::FlushConfig;
//! use std::time::Duration;
//!
//! let config = FlushConfig::default().with_interval(Duration::from_millis(250));
//! config.validate()?;
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use shared_bus::{COUNTER_CHANNEL, VOTES_TOPIC};
use std::time::Duration;

/// Flush cycle configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Consecutive all-failed cycles before each further one is logged at error level.
    pub alert_after_failed_cycles: u32,
    /// Run one last cycle when the driver is asked to stop.
    pub final_flush_on_shutdown: bool,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            alert_after_failed_cycles: 10,
            final_flush_on_shutdown: true,
        }
    }
}

impl FlushConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        Ok(())
    }

    /// Builder-style method to set the flush interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder-style method to set the alert threshold
    pub fn with_alert_after(mut self, cycles: u32) -> Self {
        self.alert_after_failed_cycles = cycles;
        self
    }

    pub fn with_final_flush(mut self, enabled: bool) -> Self {
        self.final_flush_on_shutdown = enabled;
        self
    }
}

/// Bus consumer configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Topic votes are published to.
    pub topic: String,
    /// Channel this counter consumes from.
    pub channel: String,
    /// Messages handled concurrently.
    pub max_in_flight: usize,
    /// Deliveries of one message before it is dropped.
    pub max_attempts: u16,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topic: VOTES_TOPIC.to_string(),
            channel: COUNTER_CHANNEL.to_string(),
            max_in_flight: 8,
            max_attempts: 5,
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.is_empty() {
            return Err(ConfigError::EmptyName { field: "topic" });
        }
        if self.channel.is_empty() {
            return Err(ConfigError::EmptyName { field: "channel" });
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let flush = FlushConfig::default();
        assert_eq!(flush.interval, Duration::from_secs(1));
        assert!(flush.validate().is_ok());

        let consumer = ConsumerConfig::default();
        assert_eq!(consumer.topic, "votes");
        assert_eq!(consumer.channel, "counter");
        assert!(consumer.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = FlushConfig::default().with_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroFlushInterval));
    }

    #[test]
    fn test_consumer_validation() {
        let config = ConsumerConfig::default().with_max_in_flight(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxInFlight));

        let config = ConsumerConfig {
            channel: String::new(),
            ..ConsumerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyName { field: "channel" })
        );

        let config = ConsumerConfig {
            max_attempts: 0,
            ..ConsumerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxAttempts));
    }
}
