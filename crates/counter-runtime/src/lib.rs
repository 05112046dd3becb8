//! # Counter Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary.
//!
//! - `container/` - configuration and store selection
//! - `adapters/` - TCP vote ingress and storage backends
//! - `runtime` - wiring and the shutdown sequence

pub mod adapters;
pub mod container;
pub mod error;
pub mod runtime;

pub use container::{load_config, CounterConfig};
pub use error::RuntimeError;
pub use runtime::CounterRuntime;
