//! Durable snapshots of the active and history partitions.
//!
//! Each snapshot is a JSON object mapping task id to the full task record.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::types::{Task, TaskId};

/// Snapshot file for tasks that have not reached a final status
pub const ACTIVE_SNAPSHOT_FILE: &str = "active_download_tasks.json";

/// Snapshot file for finished tasks
pub const HISTORY_SNAPSHOT_FILE: &str = "download_history.json";

/// Storage backend for task snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the active snapshot; empty if none was ever written
    async fn load_active(&self) -> Result<Vec<Task>, PersistenceError>;

    /// Load the history snapshot; empty if none was ever written
    async fn load_history(&self) -> Result<Vec<Task>, PersistenceError>;

    /// Replace the active snapshot
    async fn save_active(&self, tasks: &[Task]) -> Result<(), PersistenceError>;

    /// Replace the history snapshot
    async fn save_history(&self, tasks: &[Task]) -> Result<(), PersistenceError>;
}

/// [`SnapshotStore`] writing pretty-printed JSON files into one directory
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    /// Store snapshots under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(&self, file: &str) -> Result<Vec<Task>, PersistenceError> {
        let path = self.dir.join(file);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Read { path, source }),
        };
        let map: BTreeMap<TaskId, Task> = serde_json::from_slice(&raw)
            .map_err(|source| PersistenceError::Corrupt { path, source })?;
        Ok(map.into_values().collect())
    }

    async fn save(&self, file: &str, tasks: &[Task]) -> Result<(), PersistenceError> {
        let path = self.dir.join(file);
        let write_err = |source| PersistenceError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_err)?;

        let map: BTreeMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
        let json = serde_json::to_vec_pretty(&map)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load_active(&self) -> Result<Vec<Task>, PersistenceError> {
        self.load(ACTIVE_SNAPSHOT_FILE).await
    }

    async fn load_history(&self) -> Result<Vec<Task>, PersistenceError> {
        self.load(HISTORY_SNAPSHOT_FILE).await
    }

    async fn save_active(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        self.save(ACTIVE_SNAPSHOT_FILE, tasks).await
    }

    async fn save_history(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        self.save(HISTORY_SNAPSHOT_FILE, tasks).await
    }
}
