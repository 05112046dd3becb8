//! Adapters Layer
//!
//! Connects the counter to the message bus.

pub mod bus_adapter;

pub use bus_adapter::VoteBusAdapter;
