//! Service Layer
//!
//! Orchestrates the tally: the consumer feeds it, the flush driver drains it
//! into a `TallyStore`. The two only meet through the shared `Tally`.

pub mod consumer;
pub mod flush_driver;

pub use consumer::VoteConsumer;
pub use flush_driver::FlushDriver;

use std::sync::Arc;

use crate::domain::{FlushConfig, Tally};
use crate::error::ConfigError;
use crate::metrics::Metrics;
use crate::ports::TallyStore;

/// One tally with its consumer and flush driver wired to it.
pub struct VoteCounter {
    tally: Arc<Tally>,
    metrics: Arc<Metrics>,
    consumer: VoteConsumer,
    driver: Arc<FlushDriver>,
}

impl VoteCounter {
    pub fn new(store: Arc<dyn TallyStore>, config: FlushConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tally = Arc::new(Tally::new());
        let metrics = Arc::new(Metrics::new());
        let consumer = VoteConsumer::new(Arc::clone(&tally), Arc::clone(&metrics));
        let driver = Arc::new(FlushDriver::new(
            Arc::clone(&tally),
            store,
            config,
            Arc::clone(&metrics),
        ));
        Ok(Self {
            tally,
            metrics,
            consumer,
            driver,
        })
    }

    pub fn tally(&self) -> &Arc<Tally> {
        &self.tally
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn consumer(&self) -> VoteConsumer {
        self.consumer.clone()
    }

    pub fn driver(&self) -> Arc<FlushDriver> {
        Arc::clone(&self.driver)
    }
}
