use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::LotId;

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No snapshot for lot {0}")]
    NotFound(LotId),
}

/// Lot registry errors.
#[derive(Debug, Error)]
pub enum LotError {
    /// The lot is neither in the registry nor on disk.
    #[error("Lot not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl LotError {
    pub(crate) fn not_found(id: &LotId) -> Self {
        LotError::NotFound(id.to_string())
    }
}
