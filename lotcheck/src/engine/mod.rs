//! Lot processing engine.
//!
//! - [`Pacer`] - process-wide spacing of upstream calls
//! - [`EngineContext`] - collaborators shared by all workers
//! - worker - one FIFO drain loop per lot
//! - escalation - out-of-band retries for throttled subjects

mod context;
mod escalation;
mod pacer;
mod worker;

pub use context::EngineContext;
pub use pacer::Pacer;

pub(crate) use worker::spawn_worker;
