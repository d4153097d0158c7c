//! lotcheck - batch eligibility checks against a rate-limited upstream
//!
//! Operators submit lots of subject identifiers; each lot is drained by its
//! own worker through a process-wide pacer, throttled subjects are retried
//! out of band, and progress is snapshotted to disk after every change so a
//! restarted process resumes exactly where it stopped.
//!
//! # High-Level API
//!
//! ```ignore
//! use lotcheck::config::ConfigFile;
//! use lotcheck::engine::EngineContext;
//! use lotcheck::lot::{LotRegistry, SnapshotStore};
//! use lotcheck::upstream::{ReqwestClient, UpstreamClient};
//!
//! let file = ConfigFile::load()?;
//! let client = UpstreamClient::new(ReqwestClient::new()?, file.upstream_config());
//! let registry = LotRegistry::new(
//!     EngineContext::new(client, SnapshotStore::new(&file.lots.results_dir))
//!         .with_config(file.engine_config()),
//! );
//!
//! let lot_id = registry.submit(["123", "456"]).await;
//! let status = registry.status(&lot_id).await?;
//! ```

pub mod auth;
pub mod config;
pub mod engine;
pub mod export;
pub mod logging;
pub mod lot;
pub mod outcome;
pub mod quota;
pub mod subject;
pub mod upstream;

/// Version of the lotcheck library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
