//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - vote intake and flush control
//! - Driven Ports (outbound) - the durable tally store

pub mod inbound;
pub mod outbound;

pub use inbound::{FlushControl, VoteIntake};
pub use outbound::{InMemoryPollStore, StoreAck, TallyStore};
