//! # Event Publisher
//!
//! Defines the publishing side of the bus and the in-memory bus itself.

use crate::message::BusMessage;
use crate::subscriber::{ChannelCounters, ChannelStats, Subscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Errors from publish operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// Topic names must be non-empty.
    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),
}

/// Trait for publishing messages to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a raw body to a topic.
    ///
    /// # Returns
    ///
    /// The number of channels the message was queued on. Zero means the topic
    /// has no channels yet and the message was dropped.
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<usize, PublishError>;

    /// Get the total number of publish attempts.
    fn events_published(&self) -> u64;
}

/// Queue backing one (topic, channel) pair.
struct ChannelQueue {
    sender: mpsc::Sender<BusMessage>,
    receiver: Arc<Mutex<mpsc::Receiver<BusMessage>>>,
    counters: Arc<ChannelCounters>,
}

impl ChannelQueue {
    fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            counters: Arc::new(ChannelCounters::default()),
        }
    }
}

/// topic -> channel -> queue
type Topics = HashMap<String, HashMap<String, ChannelQueue>>;

/// In-memory implementation of the bus.
///
/// Uses one bounded `tokio::sync::mpsc` queue per channel. Suitable for a single
/// process; a networked deployment feeds it through an ingress adapter.
pub struct InMemoryEventBus {
    /// Channel queues by topic.
    topics: RwLock<Topics>,

    /// Active subscription count by "topic/channel".
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total publish attempts.
    events_published: AtomicU64,

    /// Set once by `close()`.
    closed: AtomicBool,

    /// Per-channel queue capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given per-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a channel of a topic, creating both if needed.
    ///
    /// Subscriptions on the same channel compete for messages; different
    /// channels each receive every message.
    pub fn subscribe(&self, topic: &str, channel: &str) -> Result<Subscription, SubscriptionError> {
        if topic.is_empty() || channel.is_empty() {
            return Err(SubscriptionError::InvalidName {
                topic: topic.to_string(),
                channel: channel.to_string(),
            });
        }

        let mut topics = self
            .topics
            .write()
            .map_err(|_| SubscriptionError::Closed)?;
        // Checked under the lock so a concurrent close() cannot be undone.
        if self.is_closed() {
            return Err(SubscriptionError::Closed);
        }

        let queue = topics
            .entry(topic.to_string())
            .or_default()
            .entry(channel.to_string())
            .or_insert_with(|| ChannelQueue::new(self.capacity));

        let key = channel_key(topic, channel);
        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(key.clone()).or_insert(0) += 1;
        }

        debug!(topic, channel, "New subscription created");

        Ok(Subscription::new(
            topic.to_string(),
            channel.to_string(),
            queue.receiver.clone(),
            queue.sender.downgrade(),
            queue.counters.clone(),
            self.subscriptions.clone(),
            key,
        ))
    }

    /// Close the bus.
    ///
    /// Queued messages can still be drained; afterwards every subscription's
    /// `recv()` returns `None` and new publishes and subscribes fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut topics) = self.topics.write() {
            topics.clear();
        }
        warn!("Event bus closed");
    }

    /// Whether `close()` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get the number of active subscriptions across all channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .map(|subs| subs.values().sum())
            .unwrap_or(0)
    }

    /// Number of channels registered on a topic.
    #[must_use]
    pub fn channel_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .ok()
            .and_then(|topics| topics.get(topic).map(HashMap::len))
            .unwrap_or(0)
    }

    /// Counters and current depth of one channel.
    #[must_use]
    pub fn channel_stats(&self, topic: &str, channel: &str) -> Option<ChannelStats> {
        let topics = self.topics.read().ok()?;
        let queue = topics.get(topic)?.get(channel)?;
        let depth = self.capacity.saturating_sub(queue.sender.capacity());
        Some(queue.counters.snapshot(depth))
    }

    /// Get the per-channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<usize, PublishError> {
        if topic.is_empty() {
            return Err(PublishError::InvalidTopic(topic.to_string()));
        }
        if self.is_closed() {
            return Err(PublishError::Closed);
        }

        // Always increment counter (publish was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let targets: Vec<(String, mpsc::Sender<BusMessage>, Arc<ChannelCounters>)> = {
            let topics = self.topics.read().map_err(|_| PublishError::Closed)?;
            topics
                .get(topic)
                .map(|channels| {
                    channels
                        .iter()
                        .map(|(name, q)| (name.clone(), q.sender.clone(), q.counters.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        if targets.is_empty() {
            warn!(topic, "Message dropped (no channels)");
            return Ok(0);
        }

        let message = BusMessage::new(topic, body);
        let mut delivered = 0;
        for (channel, sender, counters) in targets {
            // Waits while the channel is full.
            match sender.send(message.clone()).await {
                Ok(()) => {
                    counters.record_queued();
                    delivered += 1;
                }
                Err(_) => {
                    debug!(topic, channel = %channel, "Channel closed during publish");
                }
            }
        }

        debug!(topic, id = %message.id, channels = delivered, "Message published");
        Ok(delivered)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

fn channel_key(topic: &str, channel: &str) -> String {
    format!("{topic}/{channel}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_publish_no_channels() {
        let bus = InMemoryEventBus::new();

        let delivered = bus.publish("votes", b"cats".to_vec()).await.unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();

        // Create subscriber BEFORE publishing
        let _sub = bus.subscribe("votes", "counter").unwrap();

        let delivered = bus.publish("votes", b"cats".to_vec()).await.unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_each_channel_gets_a_copy() {
        let bus = InMemoryEventBus::new();

        let counter = bus.subscribe("votes", "counter").unwrap();
        let audit = bus.subscribe("votes", "audit").unwrap();
        let _other = bus.subscribe("polls", "counter").unwrap();

        let delivered = bus.publish("votes", b"dogs".to_vec()).await.unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(bus.channel_count("votes"), 2);

        assert_eq!(counter.recv().await.unwrap().body, b"dogs");
        assert_eq!(audit.recv().await.unwrap().body, b"dogs");
    }

    #[tokio::test]
    async fn test_publish_after_close() {
        let bus = InMemoryEventBus::new();
        bus.close();

        let result = bus.publish("votes", b"cats".to_vec()).await;
        assert_eq!(result, Err(PublishError::Closed));
        assert!(matches!(
            bus.subscribe("votes", "counter"),
            Err(SubscriptionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_empty_names_rejected() {
        let bus = InMemoryEventBus::new();

        assert!(matches!(
            bus.publish("", b"x".to_vec()).await,
            Err(PublishError::InvalidTopic(_))
        ));
        assert!(matches!(
            bus.subscribe("votes", ""),
            Err(SubscriptionError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_channel_applies_backpressure() {
        let bus = InMemoryEventBus::with_capacity(1);
        let sub = bus.subscribe("votes", "counter").unwrap();

        bus.publish("votes", b"a".to_vec()).await.unwrap();
        let blocked = timeout(Duration::from_millis(50), bus.publish("votes", b"b".to_vec())).await;
        assert!(blocked.is_err(), "second publish should wait for room");

        assert_eq!(sub.recv().await.unwrap().body, b"a");
        bus.publish("votes", b"c".to_vec()).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().body, b"c");
    }

    #[tokio::test]
    async fn test_channel_stats_depth() {
        let bus = InMemoryEventBus::with_capacity(10);
        let sub = bus.subscribe("votes", "counter").unwrap();

        for _ in 0..3 {
            bus.publish("votes", b"cats".to_vec()).await.unwrap();
        }
        let stats = bus.channel_stats("votes", "counter").unwrap();
        assert_eq!(stats.depth, 3);
        assert_eq!(stats.queued, 3);

        let msg = sub.recv().await.unwrap();
        sub.finish(&msg);
        let stats = bus.channel_stats("votes", "counter").unwrap();
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.finished, 1);

        assert!(bus.channel_stats("votes", "missing").is_none());
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
        assert!(!bus.is_closed());
    }
}
