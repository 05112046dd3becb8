//! Vote consumer
//!
//! Turns each delivered message body into one increment on the tally.

use shared_bus::{BusMessage, HandlerError, MessageHandler};
use shared_types::VoteOption;
use std::sync::Arc;
use tracing::trace;

use crate::domain::Tally;
use crate::metrics::Metrics;
use crate::ports::VoteIntake;

/// Counts votes into a shared tally.
///
/// Cheap to clone; every clone feeds the same tally.
#[derive(Clone)]
pub struct VoteConsumer {
    tally: Arc<Tally>,
    metrics: Arc<Metrics>,
}

impl VoteConsumer {
    pub fn new(tally: Arc<Tally>, metrics: Arc<Metrics>) -> Self {
        Self { tally, metrics }
    }

    pub fn tally(&self) -> &Arc<Tally> {
        &self.tally
    }
}

impl VoteIntake for VoteConsumer {
    fn on_message(&self, raw: &[u8]) {
        let option = VoteOption::from(raw);
        self.tally.increment(&option, 1);
        self.metrics.record_vote();
        trace!(%option, "Vote counted");
    }
}

impl MessageHandler for VoteConsumer {
    /// Always `Ok`: the vote is acknowledged once it is in the tally, before
    /// it is persisted.
    fn handle_message(&self, message: &BusMessage) -> Result<(), HandlerError> {
        self.on_message(&message.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer() -> VoteConsumer {
        VoteConsumer::new(Arc::new(Tally::new()), Arc::new(Metrics::new()))
    }

    #[test]
    fn test_on_message_increments_by_one() {
        let consumer = consumer();
        consumer.on_message(b"cats");
        consumer.on_message(b"cats");
        consumer.on_message(b"dogs");

        assert_eq!(consumer.tally().pending(&VoteOption::from("cats")), 2);
        assert_eq!(consumer.tally().pending(&VoteOption::from("dogs")), 1);
        assert_eq!(consumer.metrics.snapshot().votes_received, 3);
    }

    #[test]
    fn test_any_body_is_an_option() {
        let consumer = consumer();
        consumer.on_message(b"");
        consumer.on_message(&[0xff, 0xfe]);
        consumer.on_message(&[0xff, 0xfd]);

        let tally = consumer.tally();
        assert_eq!(tally.pending(&VoteOption::from_bytes(Vec::new())), 1);
        assert_eq!(tally.pending(&VoteOption::from_bytes(vec![0xff, 0xfe])), 1);
        assert_eq!(tally.len(), 3);
    }

    #[test]
    fn test_handle_message_never_rejects() {
        let consumer = consumer();
        let message = BusMessage::new("votes", b"Cats ".to_vec());

        assert!(consumer.handle_message(&message).is_ok());
        // Option keys are not normalized.
        assert_eq!(consumer.tally().pending(&VoteOption::from("cats")), 0);
        assert_eq!(consumer.tally().pending(&VoteOption::from("Cats ")), 1);
    }

    #[test]
    fn test_clones_share_tally() {
        let consumer = consumer();
        let other = consumer.clone();
        other.on_message(b"cats");
        assert_eq!(consumer.tally().pending(&VoteOption::from("cats")), 1);
    }
}
