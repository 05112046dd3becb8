//! # Shared Bus - Topic/Channel Message Bus
//!
//! In-process message bus that carries raw vote messages from producers to the
//! counter.
//!
//! ## Delivery Model
//!
//! ```text
//!  publish("votes", body)
//!          │
//!          ▼
//!   ┌──────────────┐   copy per channel   ┌──────────────────┐
//!   │ topic: votes │ ───────────────────▶ │ channel: counter │ ──▶ worker 1
//!   └──────────────┘                      │    (queue)       │ ──▶ worker 2
//!                                         └──────────────────┘ ──▶ worker N
//! ```
//!
//! - Every channel of a topic receives its own copy of each message.
//! - Subscriptions on the same channel share one queue; each message goes to one
//!   of them.
//! - Publishing applies backpressure when a channel queue is full.
//! - Messages published to a topic with no channels are dropped.
//! - Delivery is at-least-once: a requeued message comes back with `attempts + 1`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod message;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use message::{BusMessage, HandlerError, MessageHandler};
pub use publisher::{EventPublisher, InMemoryEventBus, PublishError};
pub use subscriber::{ChannelStats, EventStream, Subscription, SubscriptionError};

/// Maximum messages buffered per channel before publishers wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Topic the vote producers publish to.
pub const VOTES_TOPIC: &str = "votes";

/// Channel the counter consumes from.
pub const COUNTER_CHANNEL: &str = "counter";
