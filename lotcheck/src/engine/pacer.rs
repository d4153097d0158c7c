//! Process-wide request pacing.
//!
//! The upstream limits request rate globally, so a single [`Pacer`] is
//! shared by every lot worker. Two rules apply:
//!
//! - every call to [`Pacer::wait_for_slot`] sleeps the minimum delay, and
//!   calls are serialized so the delays of concurrent callers add up
//! - after every Nth completed result across the whole process, the next
//!   slot is preceded by an additional cool-down pause
//!
//! # Usage
//!
//! ```ignore
//! let pacer = Arc::new(Pacer::new(PacerConfig::default()));
//!
//! pacer.wait_for_slot().await;
//! // upstream call happens here...
//! if outcome.counts_as_completed() {
//!     pacer.record_completion();
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::PacerConfig;

/// Global pacing gate for upstream calls.
#[derive(Debug)]
pub struct Pacer {
    config: PacerConfig,

    /// Serializes slot acquisition across all workers.
    gate: Mutex<()>,

    /// Completed (visible) results across all lots.
    completed: AtomicU64,

    /// Set when the completion count crosses a cool-down boundary.
    cooldown_due: AtomicBool,

    /// Slots handed out (for stats).
    slots: AtomicU64,
}

impl Pacer {
    /// Creates a pacer with the given configuration.
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            gate: Mutex::new(()),
            completed: AtomicU64::new(0),
            cooldown_due: AtomicBool::new(false),
            slots: AtomicU64::new(0),
        }
    }

    /// Waits until the next upstream call may be made.
    ///
    /// Must be awaited once before every primary evaluation.
    pub async fn wait_for_slot(&self) {
        let _gate = self.gate.lock().await;

        if self.cooldown_due.swap(false, Ordering::AcqRel) {
            info!(
                cooldown_ms = self.config.cooldown().as_millis() as u64,
                completed = self.completed(),
                "Cool-down pause before next upstream call"
            );
            tokio::time::sleep(self.config.cooldown()).await;
        }

        tokio::time::sleep(self.config.min_delay()).await;

        let slot = self.slots.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(slot, "Pacer slot granted");
    }

    /// Records one completed (visible) result.
    ///
    /// Returns the process-wide completion count after this result.
    pub fn record_completion(&self) -> u64 {
        let count = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let every = self.config.cooldown_every();
        if every > 0 && count % every == 0 {
            self.cooldown_due.store(true, Ordering::Release);
        }
        count
    }

    /// Completed results recorded so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Slots granted so far.
    pub fn slots(&self) -> u64 {
        self.slots.load(Ordering::Relaxed)
    }

    /// Returns true if the next slot will include a cool-down.
    pub fn is_cooldown_due(&self) -> bool {
        self.cooldown_due.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PacerConfig::default())
    }
}
