//! Inbound Ports (Driving Ports)
//!
//! The API the bus adapter and the runtime drive the counter through.

use async_trait::async_trait;

use crate::domain::FlushReport;

/// Vote intake (Driving Port)
///
/// Called by delivery workers, possibly many at once. Never blocks on
/// persistence and never fails: every body is a valid option.
pub trait VoteIntake: Send + Sync {
    fn on_message(&self, raw: &[u8]);
}

/// Manual flush trigger (Driving Port)
#[async_trait]
pub trait FlushControl: Send + Sync {
    /// Run one flush cycle now, waiting for any cycle already in progress.
    async fn flush_now(&self) -> FlushReport;
}
