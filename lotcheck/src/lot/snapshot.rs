//! Durable lot snapshots.
//!
//! One JSON document per lot, `<results_dir>/<lot_id>.json`, rewritten as a
//! whole after every state change. Writes go to a temp file first and are
//! then renamed over the previous snapshot, so a reader never sees a torn
//! document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::{LotId, SnapshotError};
use crate::export::report_rows;
use crate::outcome::Outcome;
use crate::subject::SubjectId;

/// Persisted form of a lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub lot_id: LotId,
    pub created_at: DateTime<Utc>,
    /// Original subject list, in submission order.
    pub subjects: Vec<SubjectId>,
    /// Current outcome of every subject that has one, hidden entries included.
    pub results: Vec<Outcome>,
    pub completed: usize,
    pub total: usize,
    pub pending_retries: usize,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub finalized: bool,
}

/// Directory of lot snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Snapshot file for `id`.
    pub fn path_for(&self, id: &LotId) -> PathBuf {
        self.directory.join(format!("{}.json", id))
    }

    fn io_error(path: &Path, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Atomically replaces the snapshot of `snapshot.lot_id`.
    pub async fn write(&self, snapshot: &LotSnapshot) -> Result<(), SnapshotError> {
        let path = self.path_for(&snapshot.lot_id);
        let data = serde_json::to_vec_pretty(snapshot).map_err(|source| SnapshotError::Json {
            path: path.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Self::io_error(&self.directory, e))?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &data)
            .await
            .map_err(|e| Self::io_error(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        trace!(
            lot_id = %snapshot.lot_id,
            completed = snapshot.completed,
            total = snapshot.total,
            bytes = data.len(),
            "Snapshot written"
        );
        Ok(())
    }

    /// Loads the snapshot of `id`.
    pub async fn load(&self, id: &LotId) -> Result<LotSnapshot, SnapshotError> {
        let path = self.path_for(id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(id.clone()))
            }
            Err(e) => return Err(Self::io_error(&path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| SnapshotError::Json { path, source })
    }

    /// Identifiers of every snapshot in the directory, sorted.
    ///
    /// A missing directory yields an empty list.
    pub async fn list(&self) -> Result<Vec<LotId>, SnapshotError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&self.directory, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_error(&self.directory, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(LotId::parse)
                {
                    ids.push(id);
                } else {
                    debug!(path = %path.display(), "Skipping file with unexpected name");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Report view of a persisted lot without starting any work.
    ///
    /// Recorded visible outcomes come first in submission order, followed by
    /// a `Pending` row for every subject that has none.
    pub async fn recovered_view(&self, id: &LotId) -> Result<Vec<Outcome>, SnapshotError> {
        let snapshot = self.load(id).await?;
        Ok(report_rows(&snapshot.subjects, &snapshot.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeStatus;
    use tempfile::TempDir;

    fn sid(s: &str) -> SubjectId {
        SubjectId::from_normalized(s)
    }

    fn snapshot(id: LotId) -> LotSnapshot {
        LotSnapshot {
            lot_id: id,
            created_at: Utc::now(),
            subjects: vec![sid("00000000001"), sid("00000000002"), sid("00000000003")],
            results: vec![
                Outcome::no_benefit(sid("00000000002"), "sem saldo"),
                Outcome::throttled(sid("00000000003"), "limite"),
            ],
            completed: 1,
            total: 3,
            pending_retries: 1,
            paused: false,
            finalized: false,
        }
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("results"));
        let original = snapshot(LotId::generate());

        store.write(&original).await.unwrap();
        let loaded = store.load(&original.lot_id).await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let mut snap = snapshot(LotId::generate());

        store.write(&snap).await.unwrap();
        snap.completed = 2;
        store.write(&snap).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", snap.lot_id)]);
        assert_eq!(store.load(&snap.lot_id).await.unwrap().completed, 2);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let id = LotId::generate();
        assert!(matches!(
            store.load(&id).await,
            Err(SnapshotError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_load_corrupt_is_json_error() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let id = LotId::generate();
        std::fs::write(store.path_for(&id), "{truncated").unwrap();
        assert!(matches!(
            store.load(&id).await,
            Err(SnapshotError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_ignores_other_files() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let a = snapshot(LotId::parse("lot-a").unwrap());
        let b = snapshot(LotId::parse("lot-b").unwrap());
        store.write(&b).await.unwrap();
        store.write(&a).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp.path().join("bad name.json"), "{}").unwrap();

        let ids = store.list().await.unwrap();
        assert_eq!(ids, vec![a.lot_id, b.lot_id]);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recovered_view_fills_pending() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let snap = snapshot(LotId::generate());
        store.write(&snap).await.unwrap();

        let rows = store.recovered_view(&snap.lot_id).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|o| o.subject_id.as_str()).collect();
        assert_eq!(ids, ["00000000002", "00000000001", "00000000003"]);
        assert_eq!(rows[0].status, OutcomeStatus::ProcessedNoBenefit);
        assert_eq!(rows[1].status, OutcomeStatus::Pending);
        assert_eq!(rows[2].status, OutcomeStatus::Pending);
    }
}
