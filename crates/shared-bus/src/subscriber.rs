//! # Event Subscriber
//!
//! Defines the subscription side of the bus.

use crate::message::BusMessage;
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The channel queue is full; the requeued message was not accepted.
    #[error("Channel queue full: topic={topic:?} channel={channel:?}")]
    QueueFull { topic: String, channel: String },

    /// Topic and channel names must be non-empty.
    #[error("Invalid subscription target: topic={topic:?} channel={channel:?}")]
    InvalidName { topic: String, channel: String },
}

/// Live counters shared by every subscription on a channel.
#[derive(Debug, Default)]
pub(crate) struct ChannelCounters {
    queued: AtomicU64,
    delivered: AtomicU64,
    finished: AtomicU64,
    requeued: AtomicU64,
}

impl ChannelCounters {
    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, depth: usize) -> ChannelStats {
        ChannelStats {
            depth,
            queued: self.queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Messages waiting in the queue.
    pub depth: usize,
    /// Messages ever queued by publishers.
    pub queued: u64,
    /// Messages handed to a subscriber (requeued ones count again).
    pub delivered: u64,
    /// Messages acknowledged.
    pub finished: u64,
    /// Messages sent back for another attempt.
    pub requeued: u64,
}

/// A subscription handle for receiving messages from one channel.
///
/// Cloning yields another consumer on the same channel. When dropped, the
/// subscription count is cleaned up.
pub struct Subscription {
    topic: String,
    channel: String,

    /// Queue shared by every consumer of this channel.
    receiver: Arc<Mutex<mpsc::Receiver<BusMessage>>>,

    /// Weak so that an open subscription never keeps a closed bus alive.
    requeue_sender: mpsc::WeakSender<BusMessage>,

    counters: Arc<ChannelCounters>,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// "topic/channel" key for this subscription.
    key: String,
}

impl Subscription {
    pub(crate) fn new(
        topic: String,
        channel: String,
        receiver: Arc<Mutex<mpsc::Receiver<BusMessage>>>,
        requeue_sender: mpsc::WeakSender<BusMessage>,
        counters: Arc<ChannelCounters>,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        key: String,
    ) -> Self {
        Self {
            topic,
            channel,
            receiver,
            requeue_sender,
            counters,
            subscriptions,
            key,
        }
    }

    /// Receive the next message on this channel.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message
    /// - `None` - The bus was closed and the queue is drained
    pub async fn recv(&self) -> Option<BusMessage> {
        let message = self.receiver.lock().await.recv().await;
        if message.is_some() {
            self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        message
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - Nothing queued, or another consumer holds the queue
    /// - `Err(SubscriptionError::Closed)` - The bus was closed and drained
    pub fn try_recv(&self) -> Result<Option<BusMessage>, SubscriptionError> {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return Ok(None);
        };
        match receiver.try_recv() {
            Ok(message) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(Some(message))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Acknowledge a message as processed.
    pub fn finish(&self, message: &BusMessage) {
        self.counters.finished.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %self.topic, channel = %self.channel, id = %message.id, "Message finished");
    }

    /// Put a message back on this channel for another attempt.
    ///
    /// Never waits for queue space; a full queue is reported as `QueueFull`.
    pub fn requeue(&self, message: BusMessage) -> Result<(), SubscriptionError> {
        let sender = self
            .requeue_sender
            .upgrade()
            .ok_or(SubscriptionError::Closed)?;
        let message = message.requeued();
        let (id, attempts) = (message.id, message.attempts);
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SubscriptionError::QueueFull {
                topic: self.topic.clone(),
                channel: self.channel.clone(),
            },
            TrySendError::Closed(_) => SubscriptionError::Closed,
        })?;
        self.counters.requeued.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %self.topic, channel = %self.channel, %id, attempts, "Message requeued");
        Ok(())
    }

    /// Topic this subscription reads from.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Channel this subscription reads from.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Convert into a `Stream` of messages that ends when the bus closes.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        Box::pin(futures::stream::unfold(self, |subscription| async move {
            let message = subscription.recv().await?;
            Some((message, subscription))
        }))
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(self.key.clone()).or_insert(0) += 1;
        }
        Self {
            topic: self.topic.clone(),
            channel: self.channel.clone(),
            receiver: self.receiver.clone(),
            requeue_sender: self.requeue_sender.clone(),
            counters: self.counters.clone(),
            subscriptions: self.subscriptions.clone(),
            key: self.key.clone(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Decrement subscription count
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.key) else {
            debug!(key = %self.key, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.key);
        }
        debug!(key = %self.key, "Subscription dropped");
    }
}

/// A boxed stream of messages from one subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = BusMessage> + Send>>;
