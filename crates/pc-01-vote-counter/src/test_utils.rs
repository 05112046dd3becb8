//! Scriptable store for exercising the flush driver.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::VoteOption;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::error::StoreError;
use crate::ports::{StoreAck, TallyStore};

/// A `TallyStore` whose failures are set per option.
///
/// Calls are recorded on entry. While the gate is held, every call waits
/// inside `apply_increment` until `release` is called.
pub struct ScriptedStore {
    failing: Mutex<HashSet<VoteOption>>,
    fail_all: AtomicBool,
    persisted: Mutex<HashMap<VoteOption, u64>>,
    calls: Mutex<Vec<(VoteOption, u64)>>,
    call_count: watch::Sender<usize>,
    gate: watch::Sender<bool>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            fail_all: AtomicBool::new(false),
            persisted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            call_count: watch::Sender::new(0),
            gate: watch::Sender::new(true),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_option(&self, option: impl Into<VoteOption>) {
        self.failing.lock().insert(option.into());
    }

    pub fn heal_option(&self, option: impl Into<VoteOption>) {
        self.failing.lock().remove(&option.into());
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Total successfully applied for `option`.
    pub fn persisted(&self, option: impl Into<VoteOption>) -> u64 {
        self.persisted
            .lock()
            .get(&option.into())
            .copied()
            .unwrap_or(0)
    }

    /// Every call so far, in arrival order.
    pub fn calls(&self) -> Vec<(VoteOption, u64)> {
        self.calls.lock().clone()
    }

    /// Block subsequent calls until `release`.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Wait until at least `n` calls have arrived.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut count = self.call_count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = count.wait_for(|c| *c >= n).await;
    }

    /// Calls currently inside `apply_increment`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls seen.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn should_fail(&self, option: &VoteOption) -> bool {
        self.fail_all.load(Ordering::SeqCst) || self.failing.lock().contains(option)
    }
}

#[async_trait]
impl TallyStore for ScriptedStore {
    async fn apply_increment(
        &self,
        option: &VoteOption,
        count: u64,
    ) -> Result<StoreAck, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push((option.clone(), count));
        self.call_count.send_modify(|c| *c += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let result = if self.should_fail(option) {
            Err(StoreError::Rejected {
                option: option.to_string(),
                reason: "scripted failure".into(),
            })
        } else {
            *self.persisted.lock().entry(option.clone()).or_insert(0) += count;
            Ok(StoreAck { matched_records: 1 })
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted outage".into()));
        }
        Ok(())
    }
}
