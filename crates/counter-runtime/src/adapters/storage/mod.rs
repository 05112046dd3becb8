//! # Storage Adapters
//!
//! `TallyStore` backends the runtime can open.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature for durable result counters:
//!
//! ```toml
//! counter-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without it only the in-memory poll store is available.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbTallyStore, RESULTS_PREFIX};

// Re-export the in-memory store for testing and the default backend
pub use pc_01_vote_counter::InMemoryPollStore;
