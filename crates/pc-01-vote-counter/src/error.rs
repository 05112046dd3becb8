//! Error types for the vote counter

use shared_bus::SubscriptionError;
use thiserror::Error;

/// Errors reported by a persistence backend for a single increment.
///
/// Every variant is transient from the counter's point of view: the votes stay
/// pending and are retried on the next flush cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Increment for '{option}' rejected: {reason}")]
    Rejected { option: String, reason: String },

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Stored result for '{option}' is corrupted: {reason}")]
    Corrupted { option: String, reason: String },
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Flush interval must be greater than zero")]
    ZeroFlushInterval,

    #[error("max_in_flight must be at least 1")]
    ZeroMaxInFlight,

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
}

/// Fatal errors of the counter process.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Could not subscribe to the vote topic.
    #[error("Bus connection failure: {0}")]
    BusConnection(#[from] SubscriptionError),

    /// The subscription ended while the counter was running.
    #[error("Bus subscription lost (topic={topic}, channel={channel})")]
    SubscriptionLost { topic: String, channel: String },

    /// The store could not be reached at startup.
    #[error("Store connection failure: {0}")]
    StoreConnection(#[source] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
