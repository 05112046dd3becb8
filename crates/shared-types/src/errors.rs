//! # Error Types
//!
//! Errors raised while building shared domain records.

use thiserror::Error;

/// Errors that can occur when constructing a [`crate::Poll`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// A poll must offer at least one option.
    #[error("Poll '{title}' has no options")]
    NoOptions { title: String },

    /// The same option appears twice in one poll.
    #[error("Poll '{title}' lists option '{option}' more than once")]
    DuplicateOption { title: String, option: String },
}
