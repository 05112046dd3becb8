//! # Counter Container
//!
//! Configuration and the store it selects.

pub mod config;
pub mod store;

pub use config::{load_config, load_config_from, BusConfig, CounterConfig, StoreBackend, StoreConfig};
pub use store::open_store;
