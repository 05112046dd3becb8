//! Runtime errors
//!
//! Everything here is fatal: `main` logs it and exits with status 1.

use pc_01_vote_counter::{ConfigError, CounterError, StoreError};
use shared_types::PollError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Counter(#[from] CounterError),

    /// The vote ingress could not bind its listener.
    #[error("Bus connection failure: cannot listen on {address}: {source}")]
    IngressBind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store backend '{0}' is not compiled in")]
    BackendUnavailable(String),

    #[error("Invalid seeded poll: {0}")]
    Poll(#[from] PollError),

    #[error("Task failed: {0}")]
    Task(String),
}

impl From<ConfigError> for RuntimeError {
    fn from(e: ConfigError) -> Self {
        Self::Counter(CounterError::Config(e))
    }
}

impl From<StoreError> for RuntimeError {
    fn from(e: StoreError) -> Self {
        Self::Counter(CounterError::StoreConnection(e))
    }
}
