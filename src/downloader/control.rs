//! Task lifecycle control: pause, resume, cancel.

use std::path::Path;

use crate::error::{DownloadError, Error, Result};
use crate::registry::TransitionError;
use crate::types::{Status, TaskId};

use super::DownloadManager;

impl DownloadManager {
    /// Pause a transfer in progress
    ///
    /// Only valid from DOWNLOADING. The worker notices at its next chunk
    /// boundary and stops, keeping the partial file for a later resume.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::NotFound`] if the id is unknown
    /// - [`DownloadError::InvalidState`] from any other status
    pub async fn pause(&self, id: &TaskId) -> Result<()> {
        self.registry
            .transition(
                id,
                |t| t.status == Status::Downloading,
                |t| {
                    t.status = Status::Paused;
                    t.speed = 0.0;
                },
            )
            .await
            .map_err(|e| Error::Download(e.into_download_error(id, "pause")))?;

        tracing::info!(task_id = %id, "Task paused");
        self.notify(id).await;
        Ok(())
    }

    /// Put a paused or failed task back on the queue
    ///
    /// The retry count is kept, so a task resumed from FAILED continues
    /// spending the same attempt budget.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::NotFound`] if the id is unknown
    /// - [`DownloadError::InvalidState`] unless the task is PAUSED or FAILED and still active
    pub async fn resume(&self, id: &TaskId) -> Result<()> {
        self.registry
            .transition(
                id,
                |t| matches!(t.status, Status::Paused | Status::Failed),
                |t| {
                    t.status = Status::Queued;
                    t.error = None;
                    t.speed = 0.0;
                },
            )
            .await
            .map_err(|e| Error::Download(e.into_download_error(id, "resume")))?;

        tracing::info!(task_id = %id, "Task resumed");
        self.queue.push(id.clone());
        self.notify(id).await;
        Ok(())
    }

    /// Cancel an active task, or delete a finished one from history
    ///
    /// An active task becomes CANCELLED and moves to history. Its partial file
    /// is removed here unless a worker owns it, in which case the worker
    /// removes it when it observes the cancellation. A COMPLETED or FAILED
    /// history entry is deleted outright.
    ///
    /// # Errors
    ///
    /// [`DownloadError::NotFound`] if the id is unknown or was already cancelled.
    pub async fn cancel(&self, id: &TaskId) -> Result<()> {
        let outcome = self
            .registry
            .transition(
                id,
                |_| true,
                |t| {
                    t.status = Status::Cancelled;
                    t.speed = 0.0;
                    t.mark_ended();
                    t.temp_path.clone()
                },
            )
            .await;

        match outcome {
            Ok(temp_path) => {
                self.queue.remove(id);
                if let Some(task) = self.registry.retire(id).await {
                    self.notifier.publish(&task);
                }
                if let Some(path) = temp_path
                    && !self.runtime.is_running(id)
                {
                    remove_partial(id, &path).await;
                }
                tracing::info!(task_id = %id, "Task cancelled");
                self.spawn_retire_save();
                Ok(())
            }
            Err(TransitionError::InvalidState {
                current: Status::Cancelled,
            })
            | Err(TransitionError::NotFound) => {
                Err(Error::Download(DownloadError::NotFound { id: id.clone() }))
            }
            Err(TransitionError::InvalidState { current }) => {
                self.registry.remove_history(id).await;
                tracing::info!(task_id = %id, status = %current, "Removed task from history");
                self.spawn_retire_save();
                Ok(())
            }
        }
    }
}

/// Delete a partial file, ignoring a file that never existed
pub(crate) async fn remove_partial(id: &TaskId, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(task_id = %id, path = %path.display(), "Removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(task_id = %id, path = %path.display(), error = %e, "Failed to remove partial file")
        }
    }
}
