//! # Bus Messages
//!
//! The envelope carried by the bus and the handler contract consumers implement.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// A message travelling through the bus.
///
/// The body is opaque to the bus; no schema or versioning is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Unique message id, stable across requeues.
    pub id: Uuid,
    /// Topic the message was published to.
    pub topic: String,
    /// Raw payload.
    pub body: Vec<u8>,
    /// Unix timestamp (seconds) of the original publish.
    pub timestamp: u64,
    /// Delivery attempts so far, starting at 1.
    pub attempts: u16,
}

impl BusMessage {
    /// Create a fresh message for a first delivery.
    pub fn new(topic: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            body: body.into(),
            timestamp: current_timestamp(),
            attempts: 1,
        }
    }

    /// The same message, marked for another delivery attempt.
    #[must_use]
    pub fn requeued(mut self) -> Self {
        self.attempts = self.attempts.saturating_add(1);
        self
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Error a handler returns to ask for redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler could not process the message now.
    #[error("Message {id} rejected: {reason}")]
    Rejected { id: Uuid, reason: String },
}

/// Per-message callback invoked by a consuming adapter.
///
/// Implementations must be safe to call from several workers at once.
/// Returning `Ok` finishes (acknowledges) the message; `Err` requeues it.
pub trait MessageHandler: Send + Sync {
    fn handle_message(&self, message: &BusMessage) -> Result<(), HandlerError>;
}
