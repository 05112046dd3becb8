//! # RocksDB Tally Store
//!
//! Durable per-option result counters.
//!
//! ## Layout
//!
//! - `results/<option bytes>` → big-endian `u64` running total
//!
//! Increments are read-modify-write, serialized by one lock so concurrent
//! attempts for different options cannot interleave on the same key. All DB
//! calls run on the blocking pool.

use async_trait::async_trait;
use parking_lot::Mutex;
use pc_01_vote_counter::{StoreAck, StoreError, TallyStore};
use rocksdb::{Options, WriteOptions, DB};
use shared_types::VoteOption;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Key prefix for per-option results.
pub const RESULTS_PREFIX: &[u8] = b"results/";

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/ballots".to_string(),
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

struct Inner {
    db: DB,
    write_lock: Mutex<()>,
    sync_writes: bool,
}

/// RocksDB-backed `TallyStore`.
#[derive(Clone)]
pub struct RocksDbTallyStore {
    inner: Arc<Inner>,
}

impl RocksDbTallyStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, &config.path).map_err(|e| {
            StoreError::Unavailable(format!("Failed to open RocksDB at {}: {}", config.path, e))
        })?;
        info!(path = %config.path, "Opened RocksDB tally store");

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                write_lock: Mutex::new(()),
                sync_writes: config.sync_writes,
            }),
        })
    }

    /// Open with default settings at `path`
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    /// Stored total for `option` (0 if never written).
    pub fn result(&self, option: &VoteOption) -> Result<u64, StoreError> {
        self.inner.read_total(option)
    }
}

impl Inner {
    fn read_total(&self, option: &VoteOption) -> Result<u64, StoreError> {
        let raw = self
            .db
            .get(result_key(option))
            .map_err(|e| StoreError::Io(format!("RocksDB get failed: {}", e)))?;
        let Some(raw) = raw else {
            return Ok(0);
        };
        let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| StoreError::Corrupted {
            option: option.to_string(),
            reason: format!("expected 8 bytes, found {}", raw.len()),
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn add(&self, option: &VoteOption, count: u64) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock();
        let total = self.read_total(option)?.saturating_add(count);

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db
            .put_opt(result_key(option), total.to_be_bytes(), &write_opts)
            .map_err(|e| StoreError::Io(format!("RocksDB put failed: {}", e)))?;
        Ok(total)
    }
}

fn result_key(option: &VoteOption) -> Vec<u8> {
    let mut key = Vec::with_capacity(RESULTS_PREFIX.len() + option.len());
    key.extend_from_slice(RESULTS_PREFIX);
    key.extend_from_slice(option.as_bytes());
    key
}

#[async_trait]
impl TallyStore for RocksDbTallyStore {
    async fn apply_increment(
        &self,
        option: &VoteOption,
        count: u64,
    ) -> Result<StoreAck, StoreError> {
        let inner = Arc::clone(&self.inner);
        let owned = option.clone();
        let total = tokio::task::spawn_blocking(move || inner.add(&owned, count))
            .await
            .map_err(|e| StoreError::Io(format!("RocksDB task failed: {}", e)))??;
        debug!(%option, count, total, "Stored increment");
        Ok(StoreAck { matched_records: 1 })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner
                .db
                .property_value("rocksdb.estimate-num-keys")
                .map(|_| ())
                .map_err(|e| StoreError::Unavailable(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Io(format!("RocksDB task failed: {}", e)))?
    }
}
