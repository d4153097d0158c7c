//! Lot identifiers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Opaque, filesystem-safe lot identifier.
///
/// Generated identifiers look like `20261019T143012123-0001`: a UTC
/// timestamp with millisecond precision followed by a process-local
/// sequence number.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(String);

impl LotId {
    /// Generates a new unique identifier.
    pub fn generate() -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 10_000;
        Self(format!(
            "{}-{:04}",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            seq
        ))
    }

    /// Validates an identifier received from outside the process.
    ///
    /// Only ASCII alphanumerics, `-` and `_` are accepted, so an identifier
    /// can always be used as a file name.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LotId({})", self.0)
    }
}

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
