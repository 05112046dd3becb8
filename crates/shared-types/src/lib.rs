//! # Shared Types Crate
//!
//! Domain types shared by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the vote key and the poll record are defined here
//!   and nowhere else.
//! - **Opaque Keys**: a `VoteOption` is whatever bytes arrived on the bus. It is
//!   never normalized or validated.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
