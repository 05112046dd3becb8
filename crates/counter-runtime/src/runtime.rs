//! # Counter Runtime
//!
//! Wires the bus, the vote ingress, the consumer and the flush driver, and
//! owns the shutdown sequence.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Open the store and ping it (fatal on failure)
//! 3. Subscribe the consumer to the vote topic (fatal on failure)
//! 4. Bind the vote ingress (fatal on failure)
//! 5. Spawn consumer, flush driver and ingress
//!
//! ## Shutdown Sequence
//!
//! 1. Shutdown requested, or the subscription is lost
//! 2. Ingress stops accepting
//! 3. Consumer stops: the bus is closed and every queued vote is counted
//! 4. Driver finishes its cycle, then the final flush (unless disabled)
//! 5. Metrics snapshot returned to the caller
//!
//! Intake ends before the final snapshot, so every vote acknowledged on the
//! bus is either persisted or reported as lost.

use pc_01_vote_counter::{
    CounterError, MetricsSnapshot, TallyStore, VoteBusAdapter, VoteCounter,
};
use shared_bus::InMemoryEventBus;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::adapters::TcpVoteIngress;
use crate::container::{open_store, CounterConfig};
use crate::error::RuntimeError;

/// The counter process: one bus, one tally, one store.
pub struct CounterRuntime {
    config: CounterConfig,
    bus: Arc<InMemoryEventBus>,
    counter: VoteCounter,
    shutdown_tx: watch::Sender<bool>,
}

impl CounterRuntime {
    /// Validate `config` and open its store.
    pub async fn new(config: CounterConfig) -> Result<Self, RuntimeError> {
        let store = open_store(&config.store).await?;
        Self::with_store(config, store)
    }

    /// Build around an already opened store.
    pub fn with_store(
        config: CounterConfig,
        store: Arc<dyn TallyStore>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let counter = VoteCounter::new(store, config.flush.clone())?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            bus: Arc::new(InMemoryEventBus::new()),
            counter,
            shutdown_tx,
        })
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn counter(&self) -> &VoteCounter {
        &self.counter
    }

    /// Run until `shutdown_signal` resolves or the subscription is lost.
    ///
    /// `on_listening` receives the bound ingress address once the counter is
    /// ready for votes.
    pub async fn run<F>(
        self,
        shutdown_signal: F,
        on_listening: impl FnOnce(SocketAddr) + Send,
    ) -> Result<MetricsSnapshot, RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let metrics = Arc::clone(self.counter.metrics());
        let adapter = Arc::new(VoteBusAdapter::new(
            Arc::clone(&self.bus),
            Arc::new(self.counter.consumer()),
            self.config.bus.consumer_config(),
            Arc::clone(&metrics),
        ));

        // Subscribe first: the bus drops publishes to topics without channels.
        let subscription = adapter.connect()?;
        let ingress = TcpVoteIngress::bind(
            &self.config.bus.address,
            Arc::clone(&self.bus),
            self.config.bus.topic.clone(),
        )
        .await?;
        if let Ok(addr) = ingress.local_addr() {
            on_listening(addr);
        }

        let (ingress_stop, ingress_stop_rx) = watch::channel(false);
        let ingress_task = tokio::spawn(ingress.run(ingress_stop_rx));
        let mut consumer_task = tokio::spawn(Arc::clone(&adapter).run(subscription));
        let driver_task = tokio::spawn(self.counter.driver().run(self.shutdown_tx.subscribe()));
        info!("Counter is running");

        let consumer_exit = tokio::select! {
            _ = shutdown_signal => {
                info!("Shutdown signal received");
                None
            }
            joined = &mut consumer_task => Some(joined),
        };

        info!("Initiating graceful shutdown...");
        ingress_stop.send_replace(true);
        if let Err(e) = ingress_task.await {
            error!(error = %e, "Ingress task failed");
        }

        let outcome = match consumer_exit {
            Some(joined) => consumer_outcome(joined),
            None => {
                adapter.stop();
                consumer_outcome(consumer_task.await)
            }
        };

        self.shutdown_tx.send_replace(true);
        match driver_task.await {
            Ok(Some(report)) => info!(
                cycle = report.cycle,
                persisted = report.votes_persisted(),
                deferred = report.votes_deferred(),
                "Final flush complete"
            ),
            Ok(None) => info!("Final flush disabled"),
            Err(e) => error!(error = %e, "Flush driver task failed"),
        }

        let snapshot = metrics.snapshot();
        info!("Shutdown complete");
        outcome.map(|()| snapshot)
    }
}

fn consumer_outcome(
    joined: Result<Result<(), CounterError>, JoinError>,
) -> Result<(), RuntimeError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RuntimeError::from(e)),
        Err(e) => Err(RuntimeError::Task(e.to_string())),
    }
}
