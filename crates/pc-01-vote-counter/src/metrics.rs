//! Counters for vote intake and flush cycles
//!
//! ## Usage
//!
//! ```ignore
//! use pc_01_vote_counter::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_vote();
//!
//! let start = std::time::Instant::now();
//! let report = driver.run_cycle().await;
//! metrics.record_cycle(&report, start.elapsed());
//! ```

use crate::domain::FlushReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe counters shared by the consumer and the flush driver.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Vote messages counted into the tally
    pub votes_received: AtomicU64,
    /// Flush cycles that attempted at least one option
    pub cycles_run: AtomicU64,
    /// Flush cycles that found an empty tally
    pub cycles_skipped: AtomicU64,
    /// Per-option increments the store accepted
    pub options_persisted: AtomicU64,
    /// Per-option increments deferred to a later cycle
    pub options_failed: AtomicU64,
    /// Votes confirmed persisted
    pub votes_persisted: AtomicU64,
    /// Messages sent back to the bus for redelivery
    pub messages_requeued: AtomicU64,
    /// Messages dropped after exhausting their attempts
    pub messages_dropped: AtomicU64,
    /// Cycles in a row where every attempted option failed
    pub consecutive_failed_cycles: AtomicU64,
    /// Cumulative flush time in nanoseconds
    pub flush_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_vote(&self) {
        self.votes_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeue(&self) {
        self.messages_requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one cycle's report into the counters.
    ///
    /// Returns the number of consecutive all-failed cycles after this one.
    pub fn record_cycle(&self, report: &FlushReport, duration: Duration) -> u64 {
        if report.is_skipped() {
            self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            return self.consecutive_failed_cycles.load(Ordering::Relaxed);
        }

        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.flush_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        let persisted = report.persisted().count() as u64;
        let failed = report.outcomes.len() as u64 - persisted;
        self.options_persisted.fetch_add(persisted, Ordering::Relaxed);
        self.options_failed.fetch_add(failed, Ordering::Relaxed);
        self.votes_persisted
            .fetch_add(report.votes_persisted(), Ordering::Relaxed);

        if report.is_total_failure() {
            self.consecutive_failed_cycles.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.consecutive_failed_cycles.store(0, Ordering::Relaxed);
            0
        }
    }

    /// Average duration of non-skipped cycles in nanoseconds
    pub fn avg_flush_time_ns(&self) -> u64 {
        let total = self.flush_time_ns.load(Ordering::Relaxed);
        let count = self.cycles_run.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            votes_received: self.votes_received.load(Ordering::Relaxed),
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            options_persisted: self.options_persisted.load(Ordering::Relaxed),
            options_failed: self.options_failed.load(Ordering::Relaxed),
            votes_persisted: self.votes_persisted.load(Ordering::Relaxed),
            messages_requeued: self.messages_requeued.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            consecutive_failed_cycles: self.consecutive_failed_cycles.load(Ordering::Relaxed),
            avg_flush_ns: self.avg_flush_time_ns(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.votes_received.store(0, Ordering::Relaxed);
        self.cycles_run.store(0, Ordering::Relaxed);
        self.cycles_skipped.store(0, Ordering::Relaxed);
        self.options_persisted.store(0, Ordering::Relaxed);
        self.options_failed.store(0, Ordering::Relaxed);
        self.votes_persisted.store(0, Ordering::Relaxed);
        self.messages_requeued.store(0, Ordering::Relaxed);
        self.messages_dropped.store(0, Ordering::Relaxed);
        self.consecutive_failed_cycles.store(0, Ordering::Relaxed);
        self.flush_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub votes_received: u64,
    pub cycles_run: u64,
    pub cycles_skipped: u64,
    pub options_persisted: u64,
    pub options_failed: u64,
    pub votes_persisted: u64,
    pub messages_requeued: u64,
    pub messages_dropped: u64,
    pub consecutive_failed_cycles: u64,
    pub avg_flush_ns: u64,
}
