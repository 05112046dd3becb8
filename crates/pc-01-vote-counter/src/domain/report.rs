//! Flush cycle outcomes
//!
//! A `FlushReport` records, per option, whether the snapshotted amount reached
//! the store. Outcomes are never folded into a single success flag: each option
//! is reconciled or deferred on its own.

use serde::{Serialize, Serializer};
use shared_types::VoteOption;
use std::collections::BTreeMap;
use std::time::Duration;

/// Flush driver state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum DriverState {
    /// Waiting for the timer.
    #[default]
    Idle,
    /// Persistence attempts in progress.
    Flushing,
}

/// What happened to one option during a cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum OptionOutcome {
    /// The store applied the increment and the live count was reduced.
    Persisted {
        count: u64,
        /// Stored records the increment touched (0 is still a success).
        matched_records: usize,
    },
    /// The store rejected or could not apply the increment; the votes stay pending.
    Failed { count: u64, reason: String },
}

impl OptionOutcome {
    pub fn count(&self) -> u64 {
        match self {
            Self::Persisted { count, .. } | Self::Failed { count, .. } => *count,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }
}

/// Result of one flush cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Snapshot this cycle flushed; `None` when the cycle was skipped.
    pub snapshot_sequence: Option<u64>,
    /// Serialized as a list of `{option, outcome}` entries: option keys are
    /// raw bytes and cannot be JSON object keys.
    #[serde(serialize_with = "serialize_outcomes")]
    pub outcomes: BTreeMap<VoteOption, OptionOutcome>,
    pub elapsed: Duration,
}

impl FlushReport {
    /// A cycle that found nothing to persist.
    pub fn skipped(cycle: u64) -> Self {
        Self {
            cycle,
            snapshot_sequence: None,
            outcomes: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn completed(
        cycle: u64,
        snapshot_sequence: u64,
        outcomes: BTreeMap<VoteOption, OptionOutcome>,
        elapsed: Duration,
    ) -> Self {
        Self {
            cycle,
            snapshot_sequence: Some(snapshot_sequence),
            outcomes,
            elapsed,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.snapshot_sequence.is_none()
    }

    pub fn outcome(&self, option: &VoteOption) -> Option<&OptionOutcome> {
        self.outcomes.get(option)
    }

    /// Options whose increment reached the store.
    pub fn persisted(&self) -> impl Iterator<Item = (&VoteOption, u64)> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_persisted())
            .map(|(option, o)| (option, o.count()))
    }

    /// Options deferred to the next cycle.
    pub fn failed(&self) -> impl Iterator<Item = (&VoteOption, u64)> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_persisted())
            .map(|(option, o)| (option, o.count()))
    }

    pub fn votes_persisted(&self) -> u64 {
        self.persisted().map(|(_, c)| c).sum()
    }

    pub fn votes_deferred(&self) -> u64 {
        self.failed().map(|(_, c)| c).sum()
    }

    /// Every attempted option failed (false for skipped cycles).
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.values().all(|o| !o.is_persisted())
    }

    /// Every attempted option succeeded (true for skipped cycles).
    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(OptionOutcome::is_persisted)
    }
}

#[derive(Serialize)]
struct OutcomeEntry<'a> {
    option: std::borrow::Cow<'a, str>,
    outcome: &'a OptionOutcome,
}

fn serialize_outcomes<S: Serializer>(
    outcomes: &BTreeMap<VoteOption, OptionOutcome>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(outcomes.iter().map(|(option, outcome)| OutcomeEntry {
        option: option.to_string_lossy(),
        outcome,
    }))
}
