//! Download task context -- shared state and the per-attempt plan.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::TransferError;
use crate::registry::TransitionError;
use crate::types::{Status, Task, TaskId};
use crate::utils;

use super::super::DownloadManager;

/// Everything a worker needs to drive one task
pub(crate) struct DownloadTaskContext {
    pub(crate) id: TaskId,
    pub(crate) manager: DownloadManager,
}

impl DownloadTaskContext {
    pub(crate) fn new(manager: DownloadManager, id: TaskId) -> Self {
        Self { id, manager }
    }

    pub(super) fn config(&self) -> &Config {
        &self.manager.config
    }
}

/// Why an attempt ended without finishing or failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StopReason {
    /// Moved out of DOWNLOADING by a control operation
    Status(Status),
    /// No longer known to the registry
    Gone,
    /// The manager is shutting down; the task stays DOWNLOADING for recovery
    Shutdown,
}

impl From<TransitionError> for StopReason {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotFound => StopReason::Gone,
            TransitionError::InvalidState { current } => StopReason::Status(current),
        }
    }
}

/// Paths and resume position for one attempt
#[derive(Debug, Clone)]
pub(super) struct AttemptPlan {
    /// Target filename, fixed for the task's lifetime
    pub(super) filename: String,
    /// `<download_dir>/<filename>.<task id>.part`
    pub(super) temp_path: PathBuf,
    /// First byte to request
    pub(super) offset: u64,
}

/// Resolve the filename, partial path and resume offset for `task`.
///
/// With resume disabled any existing partial file is discarded and the
/// attempt starts from zero.
pub(super) async fn plan_attempt(config: &Config, task: &Task) -> Result<AttemptPlan, TransferError> {
    let filename = utils::resolve_filename(task.filename.as_deref(), &task.url);
    let temp_path = utils::partial_path(&config.download.download_dir, &filename, &task.id);

    let existing = match tokio::fs::metadata(&temp_path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(source) => {
            return Err(TransferError::File {
                path: temp_path,
                source,
            });
        }
    };

    let offset = if config.download.resume_support {
        existing.max(task.start_from.unwrap_or(0))
    } else {
        if existing > 0 {
            tracing::debug!(task_id = %task.id, path = %temp_path.display(), "Resume disabled, discarding partial file");
            tokio::fs::remove_file(&temp_path)
                .await
                .map_err(|source| TransferError::File {
                    path: temp_path.clone(),
                    source,
                })?;
        }
        0
    };

    Ok(AttemptPlan {
        filename,
        temp_path,
        offset,
    })
}
