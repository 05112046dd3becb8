//! # PC-01 Vote Counter
//!
//! Streaming vote tally: votes arrive one message at a time from the bus, are
//! counted in memory, and are periodically pushed to a durable store as
//! per-option increments.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure business logic, no I/O
//!   - `Tally`: pending counts under one lock, snapshot and reconcile
//!   - `FlushReport`: per-option outcome of one cycle
//!   - `FlushConfig`, `ConsumerConfig`: configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `VoteIntake`, `FlushControl`: Driving ports
//!   - `TallyStore`: Driven port (the durable store)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `VoteConsumer`: implements `VoteIntake`
//!   - `FlushDriver`: self-rearming flush loop, implements `FlushControl`
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `VoteBusAdapter`: subscribes to the vote topic and drives a handler
//!
//! ## Invariants
//!
//! - **No loss**: persisted + pending always equals the votes counted.
//! - **Reconcile once**: a snapshot entry lowers the live count at most once,
//!   and never below zero.
//! - **No overlap**: a snapshot is never taken while a cycle is outstanding.
//!
//! Delivery is at-least-once; redelivered votes are counted again.
//!
//! ## Wiring
//!
//! ```ignore
//! use pc_01_vote_counter::{
//!     ConsumerConfig, FlushConfig, InMemoryPollStore, VoteBusAdapter, VoteCounter,
//! };
//! use shared_bus::InMemoryEventBus;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(InMemoryEventBus::new());
//! let counter = VoteCounter::new(Arc::new(InMemoryPollStore::new()), FlushConfig::default())?;
//!
//! let adapter = Arc::new(VoteBusAdapter::new(
//!     bus.clone(),
//!     Arc::new(counter.consumer()),
//!     ConsumerConfig::default(),
//!     counter.metrics().clone(),
//! ));
//! let subscription = adapter.connect()?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! tokio::spawn(adapter.run(subscription));
//! tokio::spawn(counter.driver().run(shutdown_rx));
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::VoteBusAdapter;
pub use domain::{
    ConsumerConfig, DriverState, FlushConfig, FlushReport, OptionOutcome, SnapshotEntry, Tally,
    TallySnapshot,
};
pub use error::{ConfigError, CounterError, StoreError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{FlushControl, InMemoryPollStore, StoreAck, TallyStore, VoteIntake};
pub use service::{FlushDriver, VoteConsumer, VoteCounter};
