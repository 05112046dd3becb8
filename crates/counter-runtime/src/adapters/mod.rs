//! # Adapter Implementations
//!
//! - `ingress`: TCP listener publishing newline-delimited votes to the bus
//! - `storage`: `TallyStore` backends

pub mod ingress;
pub mod storage;

pub use ingress::TcpVoteIngress;
pub use storage::*;
