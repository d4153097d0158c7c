//! Subject identifiers and submission normalization.
//!
//! A subject is the unit of work evaluated against the upstream service.
//! Raw operator input is trimmed and left-padded with zeros to a fixed
//! width, then de-duplicated with first-seen order preserved.
//!
//! # Example
//!
//! ```
//! use lotcheck::subject::{normalize_subjects, DEFAULT_SUBJECT_WIDTH};
//!
//! let subjects = normalize_subjects(["123", "123", "456"], DEFAULT_SUBJECT_WIDTH);
//! let ids: Vec<&str> = subjects.iter().map(|s| s.as_str()).collect();
//! assert_eq!(ids, ["00000000123", "00000000456"]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Width subjects are zero-padded to.
pub const DEFAULT_SUBJECT_WIDTH: usize = 11;

/// A normalized, fixed-width subject identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Normalizes a raw identifier.
    ///
    /// Surrounding whitespace is removed and the value is left-padded with
    /// `0` up to `width` characters. Values already at or beyond `width` are
    /// kept as-is. Returns `None` for blank input.
    pub fn normalize(raw: &str, width: usize) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(format!("{:0>width$}", trimmed, width = width)))
    }

    /// Wraps an already-normalized identifier (e.g. read back from a snapshot).
    pub fn from_normalized(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes and de-duplicates a submission.
///
/// Blank entries are dropped. Duplicates are detected after normalization,
/// so `"123"` and `"00000000123"` collapse into one subject. The first
/// occurrence wins and submission order is preserved.
pub fn normalize_subjects<I, S>(raw: I, width: usize) -> Vec<SubjectId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|s| SubjectId::normalize(s.as_ref(), width))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Splits newline-separated operator text into raw identifiers.
///
/// Accepts `\n` and `\r\n` line endings; blank lines are skipped.
pub fn parse_subject_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
