//! # Core Domain Entities
//!
//! - **Votes**: `VoteOption`
//! - **Ballots**: `Poll`, `PollId`

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PollError;

// =============================================================================
// VOTES
// =============================================================================

/// Key identifying one selectable choice in a ballot.
///
/// The key is the raw message body exactly as received. Empty keys and keys that
/// are not valid UTF-8 are legal; two keys are equal only if their bytes are.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteOption(Vec<u8>);

impl VoteOption {
    /// Wrap raw bytes as an option key.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy text rendering, for logs and result keys.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Whether this key names the given textual option.
    #[must_use]
    pub fn matches(&self, option: &str) -> bool {
        self.0 == option.as_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteOption({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for VoteOption {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for VoteOption {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for VoteOption {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for VoteOption {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

// =============================================================================
// BALLOTS
// =============================================================================

/// Unique identifier for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PollId(pub Uuid);

impl PollId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PollId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored ballot: a title, the options voters may pick, and the running results.
///
/// `results` only ever holds keys that appear in `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub options: Vec<String>,
    pub results: BTreeMap<String, u64>,
}

impl Poll {
    /// Create a poll with zeroed results.
    pub fn new(
        title: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, PollError> {
        let title = title.into();
        let mut seen = Vec::new();
        for option in options {
            let option = option.into();
            if seen.contains(&option) {
                return Err(PollError::DuplicateOption { title, option });
            }
            seen.push(option);
        }
        if seen.is_empty() {
            return Err(PollError::NoOptions { title });
        }

        Ok(Self {
            id: PollId::new(),
            title,
            options: seen,
            results: BTreeMap::new(),
        })
    }

    /// Whether `option` is one of this poll's choices.
    #[must_use]
    pub fn has_option(&self, option: &VoteOption) -> bool {
        self.options.iter().any(|o| option.matches(o))
    }

    /// Add `count` votes for `option`.
    ///
    /// Returns `false` (and changes nothing) if the option is not on this poll.
    pub fn record(&mut self, option: &VoteOption, count: u64) -> bool {
        let Some(name) = self.options.iter().find(|o| option.matches(o)) else {
            return false;
        };
        let entry = self.results.entry(name.clone()).or_insert(0);
        *entry = entry.saturating_add(count);
        true
    }

    /// Stored result for a textual option (0 if never voted).
    #[must_use]
    pub fn result(&self, option: &str) -> u64 {
        self.results.get(option).copied().unwrap_or(0)
    }

    /// Sum of all stored results.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.results.values().fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}
