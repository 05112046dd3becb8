//! # Store Selection
//!
//! Opens the configured `TallyStore` and checks it is reachable before the
//! counter starts.

use pc_01_vote_counter::{CounterError, InMemoryPollStore, TallyStore};
use shared_types::Poll;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::config::{StoreBackend, StoreConfig};
use crate::error::RuntimeError;

/// Title of the poll seeded from `PC_POLL_OPTIONS`.
pub const DEFAULT_POLL_TITLE: &str = "default";

/// Open the configured backend and ping it.
///
/// Any failure here is a store connection failure.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TallyStore>, RuntimeError> {
    let store: Arc<dyn TallyStore> = match config.backend {
        StoreBackend::Memory => Arc::new(memory_store(config)?),
        StoreBackend::RocksDb => rocksdb_store(config)?,
    };

    if let Err(e) = store.ping().await {
        error!(backend = %config.backend, error = %e, "Store unreachable");
        return Err(CounterError::StoreConnection(e).into());
    }
    info!(backend = %config.backend, "Store connected");
    Ok(store)
}

fn memory_store(config: &StoreConfig) -> Result<InMemoryPollStore, RuntimeError> {
    let store = InMemoryPollStore::new();
    if config.poll_options.is_empty() {
        warn!("No poll options configured; increments will match no records");
        return Ok(store);
    }
    let poll = Poll::new(DEFAULT_POLL_TITLE, config.poll_options.iter().cloned())?;
    info!(id = %poll.id, options = ?poll.options, "Seeded poll");
    store.add_poll(poll);
    Ok(store)
}

#[cfg(feature = "rocksdb")]
fn rocksdb_store(config: &StoreConfig) -> Result<Arc<dyn TallyStore>, RuntimeError> {
    use crate::adapters::RocksDbTallyStore;

    let store = RocksDbTallyStore::open_default(&config.address)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn rocksdb_store(_config: &StoreConfig) -> Result<Arc<dyn TallyStore>, RuntimeError> {
    Err(RuntimeError::BackendUnavailable(StoreBackend::RocksDb.to_string()))
}
