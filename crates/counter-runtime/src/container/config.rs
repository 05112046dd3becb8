//! # Counter Configuration
//!
//! Unified configuration for the bus, the store and the flush cycle.
//! Every field has a default; `load_config` overrides them from `PC_*`
//! environment variables.

use pc_01_vote_counter::{ConfigError, ConsumerConfig, FlushConfig};
use serde::Serialize;
use shared_bus::{COUNTER_CHANNEL, VOTES_TOPIC};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Complete counter configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterConfig {
    /// Message bus configuration.
    pub bus: BusConfig,
    /// Store configuration.
    pub store: StoreConfig,
    /// Flush cycle configuration.
    pub flush: FlushConfig,
}

impl CounterConfig {
    /// Validate before anything is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flush.validate()?;
        self.bus.consumer_config().validate()?;
        if self.bus.address.is_empty() {
            return Err(ConfigError::EmptyName {
                field: "bus.address",
            });
        }
        if self.store.backend == StoreBackend::RocksDb && self.store.address.as_os_str().is_empty()
        {
            return Err(ConfigError::EmptyName {
                field: "store.address",
            });
        }
        Ok(())
    }
}

/// Message bus configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BusConfig {
    /// Address the vote ingress listens on.
    pub address: String,
    /// Topic votes are published to.
    pub topic: String,
    /// Channel the counter consumes.
    pub channel: String,
    /// Messages handled concurrently.
    pub max_in_flight: usize,
    /// Deliveries of one message before it is dropped.
    pub max_attempts: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4150".to_string(),
            topic: VOTES_TOPIC.to_string(),
            channel: COUNTER_CHANNEL.to_string(),
            max_in_flight: 8,
            max_attempts: 5,
        }
    }
}

impl BusConfig {
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            topic: self.topic.clone(),
            channel: self.channel.clone(),
            max_in_flight: self.max_in_flight,
            max_attempts: self.max_attempts,
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize)]
pub struct StoreConfig {
    /// Database directory (RocksDB backend).
    pub address: PathBuf,
    pub backend: StoreBackend,
    /// Options of the poll seeded into the in-memory store.
    pub poll_options: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: PathBuf::from("./data/ballots"),
            backend: StoreBackend::Memory,
            poll_options: Vec::new(),
        }
    }
}

/// Which `TallyStore` implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StoreBackend {
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::RocksDb => f.write_str("rocksdb"),
        }
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> CounterConfig {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
///
/// Unparseable values are logged and the default is kept.
pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> CounterConfig {
    let mut config = CounterConfig::default();

    if let Some(address) = lookup("PC_BUS_ADDRESS") {
        config.bus.address = address;
    }
    if let Some(topic) = lookup("PC_BUS_TOPIC") {
        config.bus.topic = topic;
    }
    if let Some(channel) = lookup("PC_BUS_CHANNEL") {
        config.bus.channel = channel;
    }
    if let Some(n) = parse_var(&lookup, "PC_MAX_IN_FLIGHT") {
        config.bus.max_in_flight = n;
    }
    if let Some(n) = parse_var(&lookup, "PC_MAX_ATTEMPTS") {
        config.bus.max_attempts = n;
    }

    if let Some(address) = lookup("PC_STORE_ADDRESS") {
        config.store.address = PathBuf::from(address);
    }
    if let Some(backend) = parse_var(&lookup, "PC_STORE_BACKEND") {
        config.store.backend = backend;
    }
    if let Some(options) = lookup("PC_POLL_OPTIONS") {
        config.store.poll_options = options
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(ms) = parse_var::<u64>(&lookup, "PC_FLUSH_INTERVAL_MS") {
        config.flush.interval = Duration::from_millis(ms);
    }
    if let Some(n) = parse_var(&lookup, "PC_ALERT_AFTER_FAILED_CYCLES") {
        config.flush.alert_after_failed_cycles = n;
    }
    if let Some(enabled) = parse_var(&lookup, "PC_FINAL_FLUSH") {
        config.flush.final_flush_on_shutdown = enabled;
    }

    info!(
        bus = %config.bus.address,
        backend = %config.store.backend,
        interval_ms = config.flush.interval.as_millis() as u64,
        "Configuration loaded"
    );
    config
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid environment value");
            None
        }
    }
}
