//! Lots: batch submissions and their lifecycle.
//!
//! - [`LotRegistry`] - submit, pause, resume, status and recovery
//! - [`LotState`] / [`LotHandle`] - per-lot state behind a per-lot lock
//! - [`SnapshotStore`] - crash-safe JSON snapshot per lot
//!
//! # Example
//!
//! ```ignore
//! let registry = LotRegistry::new(context);
//! let id = registry.submit(["123", "123", "456"]).await;
//!
//! let status = registry.status(&id).await?;
//! assert_eq!(status.total, 2);
//! ```

mod error;
mod id;
mod registry;
mod snapshot;
mod state;

pub use error::{LotError, SnapshotError};
pub use id::LotId;
pub use registry::LotRegistry;
pub use snapshot::{LotSnapshot, SnapshotStore};
pub use state::{LotHandle, LotState, LotStatus, LotSummary, WorkerState};
