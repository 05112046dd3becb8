//! Outbound Ports (Driven Ports)
//!
//! The durable side of the counter. A `TallyStore` applies one option's
//! increment at a time; the flush driver decides what to do with each outcome.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Poll, PollId, VoteOption};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::error::StoreError;

/// Acknowledgement of an applied increment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreAck {
    /// Stored records the increment touched. Zero is not an error.
    pub matched_records: usize,
}

/// Durable vote store (Driven Port)
///
/// Increments are not deduplicated: applying the same increment twice counts it
/// twice. Any `Err` means the increment was not applied.
#[async_trait]
pub trait TallyStore: Send + Sync {
    /// Add `count` to the stored results for `option`.
    async fn apply_increment(&self, option: &VoteOption, count: u64)
        -> Result<StoreAck, StoreError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Poll records held in memory.
///
/// An increment is applied to every poll whose option list contains the option.
#[derive(Debug)]
pub struct InMemoryPollStore {
    polls: RwLock<Vec<Poll>>,
    available: AtomicBool,
}

impl Default for InMemoryPollStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPollStore {
    pub fn new() -> Self {
        Self::with_polls(Vec::new())
    }

    pub fn with_polls(polls: Vec<Poll>) -> Self {
        Self {
            polls: RwLock::new(polls),
            available: AtomicBool::new(true),
        }
    }

    pub fn add_poll(&self, poll: Poll) -> PollId {
        let id = poll.id;
        self.polls.write().push(poll);
        id
    }

    pub fn poll(&self, id: PollId) -> Option<Poll> {
        self.polls.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn polls(&self) -> Vec<Poll> {
        self.polls.read().clone()
    }

    /// Stored result for `option` summed over every poll.
    pub fn result_total(&self, option: &str) -> u64 {
        self.polls
            .read()
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.result(option)))
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }
}

#[async_trait]
impl TallyStore for InMemoryPollStore {
    async fn apply_increment(
        &self,
        option: &VoteOption,
        count: u64,
    ) -> Result<StoreAck, StoreError> {
        self.check_available()?;
        let matched_records = self
            .polls
            .write()
            .iter_mut()
            .map(|poll| poll.record(option, count))
            .filter(|matched| *matched)
            .count();
        debug!(%option, count, matched_records, "Applied increment");
        Ok(StoreAck { matched_records })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
