//! Daily upstream usage counter.
//!
//! The engine reports every visible outcome it records through the
//! [`QuotaRecorder`] collaborator. [`DailyQuotaFile`] keeps the count in a
//! small JSON document that resets when the local date changes:
//!
//! ```json
//! {"date": "2026-10-19", "count": 42}
//! ```

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Quota file errors.
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Quota file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Quota file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receives one call per visible outcome recorded by the engine.
pub trait QuotaRecorder: Send + Sync {
    /// Counts one upstream usage. Failures are logged, never propagated.
    fn record_usage(&self);

    /// Usage counted so far today.
    fn count_today(&self) -> u64;
}

/// Recorder that counts nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullQuota;

impl QuotaRecorder for NullQuota {
    fn record_usage(&self) {}

    fn count_today(&self) -> u64 {
        0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct QuotaDocument {
    date: NaiveDate,
    count: u64,
}

impl QuotaDocument {
    fn count_on(slot: &Option<Self>, date: NaiveDate) -> u64 {
        match slot {
            Some(doc) if doc.date == date => doc.count,
            _ => 0,
        }
    }
}

/// Counter slot shared with background flushes.
#[derive(Debug, Default)]
struct Counter {
    loaded: bool,
    current: Option<QuotaDocument>,
}

/// JSON counter file keyed by local date.
///
/// The file is read once, on first use; afterwards the count lives in
/// memory. Recorder updates are flushed on the blocking pool when a tokio
/// runtime is available, so engine tasks never wait on the disk.
#[derive(Debug)]
pub struct DailyQuotaFile {
    path: PathBuf,
    counter: Arc<Mutex<Counter>>,
}

impl DailyQuotaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            counter: Arc::new(Mutex::new(Counter::default())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored for `date`, zero if the file is missing or for another day.
    pub fn count_on(&self, date: NaiveDate) -> Result<u64, QuotaError> {
        let mut counter = self.counter.lock();
        self.ensure_loaded(&mut counter)?;
        Ok(QuotaDocument::count_on(&counter.current, date))
    }

    /// Increments the count for `date`, writes the file, and returns the
    /// new value.
    pub fn increment_on(&self, date: NaiveDate) -> Result<u64, QuotaError> {
        let mut counter = self.counter.lock();
        let count = self.bump(&mut counter, date)?;
        write_document(&self.path, &counter.current)?;
        Ok(count)
    }

    fn bump(&self, counter: &mut Counter, date: NaiveDate) -> Result<u64, QuotaError> {
        self.ensure_loaded(counter)?;
        let count = QuotaDocument::count_on(&counter.current, date) + 1;
        counter.current = Some(QuotaDocument { date, count });
        Ok(count)
    }

    fn ensure_loaded(&self, counter: &mut Counter) -> Result<(), QuotaError> {
        if counter.loaded {
            return Ok(());
        }
        counter.current = match std::fs::read(&self.path) {
            Ok(bytes) => Some(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        counter.loaded = true;
        Ok(())
    }

    /// Writes the latest in-memory count.
    ///
    /// Flushes hold the counter lock while writing, so the last one to run
    /// always writes the newest value.
    fn flush(&self) {
        let path = self.path.clone();
        let counter = Arc::clone(&self.counter);
        let write = move || {
            let counter = counter.lock();
            if let Err(e) = write_document(&path, &counter.current) {
                warn!(path = %path.display(), error = %e, "Failed to write quota counter");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

fn write_document(path: &Path, document: &Option<QuotaDocument>) -> Result<(), QuotaError> {
    let Some(document) = document else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec(document)?)?;
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl QuotaRecorder for DailyQuotaFile {
    fn record_usage(&self) {
        let bumped = {
            let mut counter = self.counter.lock();
            self.bump(&mut counter, today())
        };
        match bumped {
            Ok(_) => self.flush(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to update quota counter")
            }
        }
    }

    fn count_today(&self) -> u64 {
        self.count_on(today()).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to read quota counter");
            0
        })
    }
}
