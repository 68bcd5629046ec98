//! Task lookup, listing and file descriptors.

use crate::error::{DownloadError, Error, Result};
use crate::types::{FileInfo, Status, Task, TaskCounts, TaskFilter, TaskId, TaskPage};

use super::DownloadManager;

/// Page size used when a caller does not pass a limit
pub const DEFAULT_LIST_LIMIT: usize = 100;

impl DownloadManager {
    /// Full record of one task, active or finished
    pub async fn get(&self, id: &TaskId) -> Result<Task> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::Download(DownloadError::NotFound { id: id.clone() }))
    }

    /// Filtered page of tasks, newest start first, with the unpaginated total
    pub async fn list(&self, filter: &TaskFilter, limit: usize, offset: usize) -> TaskPage {
        self.registry.list(filter, limit, offset).await
    }

    /// Descriptor of the file backing a task.
    ///
    /// A completed task reports its final file; anything else reports the
    /// partial file, if one exists yet.
    pub async fn files(&self, id: &TaskId) -> Result<FileInfo> {
        let task = self.get(id).await?;
        let path = match task.status {
            Status::Completed => task.file_path,
            _ => task.temp_path,
        }
        .ok_or_else(|| Error::Download(DownloadError::FileNotFound { id: id.clone() }))?;

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Download(DownloadError::FileNotFound { id: id.clone() }));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileInfo {
            name,
            path,
            size: meta.len(),
            is_dir: false,
        })
    }

    /// Partition sizes and in-flight counts
    pub async fn counts(&self) -> TaskCounts {
        self.registry.counts().await
    }

    /// Ids waiting in the dispatch queue (may include stale entries)
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }
}
