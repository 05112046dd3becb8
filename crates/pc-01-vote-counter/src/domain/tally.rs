//! Pending vote tally
//!
//! The tally maps each option to the votes received since that option was last
//! confirmed persisted. One exclusive lock guards the whole map; it is held only
//! for O(1) increments, the snapshot copy, and single-entry reconciliation.
//!
//! ## Invariants
//!
//! - A count is only ever lowered by reconciling a snapshot entry, and only by
//!   the amount that entry captured. Votes counted after the snapshot survive.
//! - A snapshot entry can be reconciled at most once (it is consumed).
//! - Counts never go below zero; entries that reach zero are removed.

use parking_lot::Mutex;
use shared_types::VoteOption;
use std::collections::hash_map::{self, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Concurrency-safe map of pending increments.
#[derive(Debug, Default)]
pub struct Tally {
    counts: Mutex<HashMap<VoteOption, u64>>,
    snapshots_taken: AtomicU64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` votes for `option`, creating the entry if absent.
    pub fn increment(&self, option: &VoteOption, n: u64) {
        if n == 0 {
            return;
        }
        let mut counts = self.counts.lock();
        match counts.get_mut(option) {
            Some(count) => *count = count.saturating_add(n),
            None => {
                counts.insert(option.clone(), n);
            }
        }
    }

    /// Votes pending for `option`.
    pub fn pending(&self, option: &VoteOption) -> u64 {
        self.counts.lock().get(option).copied().unwrap_or(0)
    }

    /// Votes pending across all options.
    pub fn pending_total(&self) -> u64 {
        self.counts
            .lock()
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Number of options with pending votes.
    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }

    /// Copy the current counts without clearing them.
    ///
    /// Increments arriving after this call accumulate on the live map only.
    pub fn snapshot(&self) -> TallySnapshot {
        let entries = self.counts.lock().clone();
        let sequence = self.snapshots_taken.fetch_add(1, Ordering::Relaxed) + 1;
        TallySnapshot { sequence, entries }
    }

    /// Clear the snapshotted amount for `option` after it was persisted.
    ///
    /// Removes the entry from `snapshot`, so a second call for the same option
    /// is a no-op. Returns the amount actually subtracted.
    pub fn reconcile_success(&self, snapshot: &mut TallySnapshot, option: &VoteOption) -> u64 {
        snapshot
            .take(option)
            .map(|entry| self.reconcile(entry))
            .unwrap_or(0)
    }

    /// Subtract a persisted snapshot entry from the live count.
    ///
    /// Returns the amount actually subtracted.
    pub fn reconcile(&self, entry: SnapshotEntry) -> u64 {
        let mut counts = self.counts.lock();
        let hash_map::Entry::Occupied(mut live) = counts.entry(entry.option) else {
            warn!(count = entry.count, "Reconciled option has no live count");
            return 0;
        };

        let current = *live.get();
        if current < entry.count {
            warn!(
                option = %live.key(),
                live = current,
                snapshotted = entry.count,
                "Live count below snapshotted amount; clamping to zero"
            );
        }
        let cleared = current.min(entry.count);
        let remaining = current - cleared;
        if remaining == 0 {
            live.remove();
        } else {
            *live.get_mut() = remaining;
        }
        cleared
    }
}

/// Point-in-time copy of the pending counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallySnapshot {
    sequence: u64,
    entries: HashMap<VoteOption, u64>,
}

impl TallySnapshot {
    /// Monotonic number of this snapshot, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captured amount for `option`, if it is still unreconciled.
    pub fn get(&self, option: &VoteOption) -> Option<u64> {
        self.entries.get(option).copied()
    }

    /// Sum of all captured amounts still in the snapshot.
    pub fn total(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Remove and return the entry for `option`.
    pub fn take(&mut self, option: &VoteOption) -> Option<SnapshotEntry> {
        self.entries
            .remove_entry(option)
            .map(|(option, count)| SnapshotEntry { option, count })
    }

    /// Iterate over the captured (option, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&VoteOption, u64)> {
        self.entries.iter().map(|(option, count)| (option, *count))
    }
}

impl IntoIterator for TallySnapshot {
    type Item = SnapshotEntry;
    type IntoIter = std::iter::Map<
        hash_map::IntoIter<VoteOption, u64>,
        fn((VoteOption, u64)) -> SnapshotEntry,
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn to_entry((option, count): (VoteOption, u64)) -> SnapshotEntry {
            SnapshotEntry { option, count }
        }
        self.entries
            .into_iter()
            .map(to_entry as fn((VoteOption, u64)) -> SnapshotEntry)
    }
}

/// One option's captured amount, owned by whoever will persist it.
///
/// Not `Clone`: reconciling consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    option: VoteOption,
    count: u64,
}

impl SnapshotEntry {
    pub fn option(&self) -> &VoteOption {
        &self.option
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
