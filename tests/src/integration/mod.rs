//! # Integration Tests
//!
//! Wire the real bus, consumer adapter, tally and flush driver together and
//! check the counting properties end to end.

pub mod partial_failure;
pub mod runtime_shutdown;
pub mod vote_flow;

use pc_01_vote_counter::{
    ConsumerConfig, FlushConfig, TallyStore, VoteBusAdapter, VoteConsumer, VoteCounter,
};
use shared_bus::{InMemoryEventBus, Subscription};
use std::sync::Arc;

/// A counter subscribed to a fresh bus, consumer not yet running.
pub struct Harness {
    pub bus: Arc<InMemoryEventBus>,
    pub counter: VoteCounter,
    pub adapter: Arc<VoteBusAdapter<VoteConsumer>>,
    pub subscription: Option<Subscription>,
}

impl Harness {
    pub fn new(store: Arc<dyn TallyStore>, flush: FlushConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let counter = VoteCounter::new(store, flush).expect("valid flush config");
        let adapter = Arc::new(VoteBusAdapter::new(
            Arc::clone(&bus),
            Arc::new(counter.consumer()),
            ConsumerConfig::default(),
            Arc::clone(counter.metrics()),
        ));
        let subscription = adapter.connect().expect("subscribe");
        Self {
            bus,
            counter,
            adapter,
            subscription: Some(subscription),
        }
    }

    /// Start the consumer workers.
    pub fn start_consumer(&mut self) -> tokio::task::JoinHandle<()> {
        let subscription = self.subscription.take().expect("consumer already started");
        let adapter = Arc::clone(&self.adapter);
        tokio::spawn(async move {
            let _ = adapter.run(subscription).await;
        })
    }

    /// Publish `n` votes for each listed option.
    pub async fn publish(&self, votes: &[(&str, usize)]) {
        use shared_bus::EventPublisher;
        for (option, n) in votes {
            for _ in 0..*n {
                self.bus
                    .publish(shared_bus::VOTES_TOPIC, option.as_bytes().to_vec())
                    .await
                    .expect("publish");
            }
        }
    }

    /// Wait until the tally has counted `n` votes in total.
    pub async fn wait_counted(&self, n: u64) {
        let metrics = Arc::clone(self.counter.metrics());
        tokio::time::timeout(std::time::Duration::from_secs(5), async move {
            while metrics.snapshot().votes_received < n {
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("votes should be counted");
    }
}
