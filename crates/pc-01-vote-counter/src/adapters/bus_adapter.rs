//! Event Bus Adapter for the vote counter
//!
//! Subscribes to the vote topic on the counter's channel and hands each
//! delivered message to a `MessageHandler` on a bounded pool of workers.
//! Handled messages are finished; rejected ones are requeued until they run
//! out of attempts.
//!
//! `stop()` closes the bus: queued and in-flight messages are still handled
//! before `run` returns.

use shared_bus::{BusMessage, InMemoryEventBus, MessageHandler, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::domain::ConsumerConfig;
use crate::error::CounterError;
use crate::metrics::Metrics;

/// Bus adapter feeding vote messages to a handler.
pub struct VoteBusAdapter<H>
where
    H: MessageHandler + 'static,
{
    /// Reference to the event bus
    bus: Arc<InMemoryEventBus>,
    handler: Arc<H>,
    config: ConsumerConfig,
    metrics: Arc<Metrics>,
    stopping: AtomicBool,
}

impl<H> VoteBusAdapter<H>
where
    H: MessageHandler + 'static,
{
    pub fn new(
        bus: Arc<InMemoryEventBus>,
        handler: Arc<H>,
        config: ConsumerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            bus,
            handler,
            config,
            metrics,
            stopping: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Subscribe to the configured topic and channel.
    ///
    /// Subscribe before anything publishes: the bus drops messages for topics
    /// with no channels.
    pub fn connect(&self) -> Result<Subscription, CounterError> {
        self.config.validate()?;
        let subscription = self
            .bus
            .subscribe(&self.config.topic, &self.config.channel)?;
        info!(
            topic = %self.config.topic,
            channel = %self.config.channel,
            max_in_flight = self.config.max_in_flight,
            "[VoteBusAdapter] Subscribed"
        );
        Ok(subscription)
    }

    /// Stop intake. `run` drains what the bus already holds and returns `Ok`.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.bus.close();
    }

    /// Deliver messages until the subscription ends.
    ///
    /// Only returns once the bus is closed, after every in-flight delivery
    /// has finished. The subscription ending without `stop()` is an error for
    /// a long-running counter.
    pub async fn run(self: Arc<Self>, subscription: Subscription) -> Result<(), CounterError> {
        let subscription = Arc::new(subscription);
        let total = u32::try_from(self.config.max_in_flight).unwrap_or(u32::MAX);
        let permits = Arc::new(Semaphore::new(total as usize));

        loop {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let Some(message) = subscription.recv().await else {
                break;
            };

            let adapter = Arc::clone(&self);
            let subscription = Arc::clone(&subscription);
            tokio::spawn(async move {
                adapter.deliver(&subscription, message).await;
                drop(permit);
            });
        }

        // Drain in-flight deliveries before reporting the loss.
        let _ = permits.acquire_many(total).await;
        if self.stopping.load(Ordering::SeqCst) {
            info!(
                topic = %self.config.topic,
                channel = %self.config.channel,
                "[VoteBusAdapter] Stopped"
            );
            return Ok(());
        }
        error!(
            topic = %self.config.topic,
            channel = %self.config.channel,
            "[VoteBusAdapter] Subscription ended"
        );
        Err(CounterError::SubscriptionLost {
            topic: self.config.topic.clone(),
            channel: self.config.channel.clone(),
        })
    }

    async fn deliver(&self, subscription: &Subscription, message: BusMessage) {
        let Err(e) = self.handler.handle_message(&message) else {
            subscription.finish(&message);
            return;
        };

        if message.attempts < self.config.max_attempts {
            warn!(id = %message.id, attempts = message.attempts, error = %e, "Requeueing message");
            self.metrics.record_requeue();
            if let Err(err) = subscription.requeue(message) {
                warn!(error = %err, "Requeue failed, message dropped");
                self.metrics.record_dropped();
            }
        } else {
            error!(id = %message.id, attempts = message.attempts, error = %e, "Message dropped after final attempt");
            self.metrics.record_dropped();
            subscription.finish(&message);
        }
    }
}
