//! Domain Layer - Pure business logic
//!
//! This layer contains:
//! - The pending vote tally and its snapshots
//! - Per-cycle flush reports
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod config;
pub mod report;
pub mod tally;

pub use config::{ConsumerConfig, FlushConfig};
pub use report::{DriverState, FlushReport, OptionOutcome};
pub use tally::{SnapshotEntry, Tally, TallySnapshot};
