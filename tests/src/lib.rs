//! # Poll Counter Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Bus → consumer → tally → driver → store
//!     ├── vote_flow.rs
//!     ├── partial_failure.rs
//!     └── runtime_shutdown.rs  # TCP ingress through CounterRuntime shutdown
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pc-tests
//! cargo test -p pc-tests integration::partial_failure
//!
//! # Benchmarks
//! cargo bench -p pc-tests
//! ```

pub mod integration;
