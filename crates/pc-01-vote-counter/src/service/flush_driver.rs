//! Flush cycle driver
//!
//! Each cycle snapshots the tally, hands every (option, count) pair to the
//! store concurrently, and reconciles each success back into the tally as it
//! resolves. Failed options are left untouched; the next snapshot carries
//! their old votes plus anything counted since.
//!
//! ```text
//!            sleep(interval)
//!   Idle ─────────────────────→ Flushing
//!    ↑                              │
//!    └──── all attempts resolved ───┘
//! ```
//!
//! The timer is armed only after a cycle finishes, so a slow store stretches
//! the period instead of stacking cycles.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::domain::{DriverState, FlushConfig, FlushReport, OptionOutcome, Tally};
use crate::metrics::Metrics;
use crate::ports::{FlushControl, TallyStore};

/// Periodically persists the tally.
pub struct FlushDriver {
    tally: Arc<Tally>,
    store: Arc<dyn TallyStore>,
    config: FlushConfig,
    metrics: Arc<Metrics>,
    state: watch::Sender<DriverState>,
    /// Held for the whole of a cycle.
    cycle_guard: Mutex<()>,
    cycles: AtomicU64,
}

impl FlushDriver {
    pub fn new(
        tally: Arc<Tally>,
        store: Arc<dyn TallyStore>,
        config: FlushConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            tally,
            store,
            config,
            metrics,
            state: watch::Sender::new(DriverState::Idle),
            cycle_guard: Mutex::new(()),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &FlushConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    /// Observe `Idle`/`Flushing` transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    /// Cycles started so far, skipped ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Run one flush cycle.
    ///
    /// Waits for any cycle already in progress, so two cycles never overlap.
    pub async fn run_cycle(&self) -> FlushReport {
        let _guard = self.cycle_guard.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let mut snapshot = self.tally.snapshot();
        if snapshot.is_empty() {
            debug!(cycle, "Tally empty, skipping flush");
            let report = FlushReport::skipped(cycle);
            self.metrics.record_cycle(&report, Duration::ZERO);
            return report;
        }

        self.state.send_replace(DriverState::Flushing);
        let start = Instant::now();
        let sequence = snapshot.sequence();
        debug!(
            cycle,
            sequence,
            options = snapshot.len(),
            votes = snapshot.total(),
            "Flushing tally"
        );

        let entries: Vec<_> = snapshot
            .iter()
            .map(|(option, count)| (option.clone(), count))
            .collect();
        let store = &self.store;
        let mut attempts: FuturesUnordered<_> = entries
            .into_iter()
            .map(|(option, count)| {
                async move {
                    let result = store.apply_increment(&option, count).await;
                    (option, count, result)
                }
            })
            .collect();

        let mut outcomes = BTreeMap::new();
        while let Some((option, count, result)) = attempts.next().await {
            let outcome = match result {
                Ok(ack) => {
                    let cleared = self.tally.reconcile_success(&mut snapshot, &option);
                    debug!(cycle, %option, count, cleared, matched = ack.matched_records, "Increment persisted");
                    OptionOutcome::Persisted {
                        count,
                        matched_records: ack.matched_records,
                    }
                }
                Err(e) => {
                    warn!(cycle, %option, count, error = %e, "Increment not persisted, retrying next cycle");
                    OptionOutcome::Failed {
                        count,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.insert(option, outcome);
        }

        let elapsed = start.elapsed();
        let report = FlushReport::completed(cycle, sequence, outcomes, elapsed);
        let failed_streak = self.metrics.record_cycle(&report, elapsed);

        if report.is_total_failure() {
            let threshold = u64::from(self.config.alert_after_failed_cycles);
            if threshold > 0 && failed_streak >= threshold {
                error!(
                    cycle,
                    failed_streak,
                    pending = self.tally.pending_total(),
                    "Every increment failed for {} consecutive cycles",
                    failed_streak
                );
            }
        }
        info!(
            cycle,
            persisted = report.votes_persisted(),
            deferred = report.votes_deferred(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Flush cycle complete"
        );

        self.state.send_replace(DriverState::Idle);
        report
    }

    /// Run cycles until `shutdown` turns true (or its sender is dropped).
    ///
    /// A cycle in progress is never interrupted. Returns the report of the
    /// final cycle when `final_flush_on_shutdown` is set.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Option<FlushReport> {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Flush driver started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Flush driver stopping");
        if !self.config.final_flush_on_shutdown {
            self.log_lost_votes();
            return None;
        }

        let report = self.run_cycle().await;
        self.log_lost_votes();
        Some(report)
    }

    fn log_lost_votes(&self) {
        let pending = self.tally.pending_total();
        if pending > 0 {
            error!(
                pending,
                options = self.tally.len(),
                "Votes not persisted at shutdown are lost"
            );
        }
    }
}

#[async_trait]
impl FlushControl for FlushDriver {
    async fn flush_now(&self) -> FlushReport {
        self.run_cycle().await
    }
}
