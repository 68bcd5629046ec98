//! Submission and startup recovery.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::types::{DownloadRequest, Status, Task, TaskId};

use super::DownloadManager;

impl DownloadManager {
    /// Submit a download and return its id.
    ///
    /// The task is created QUEUED and appended to the dispatch queue. No I/O
    /// happens here; the transfer starts once a worker is free.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::InvalidRequest`] if the URL is not an absolute http(s) URL
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use remote_dl::*;
    /// # async fn example(manager: DownloadManager) -> Result<()> {
    /// let id = manager
    ///     .submit(DownloadRequest {
    ///         url: "https://example.com/file.iso".into(),
    ///         ..Default::default()
    ///     })
    ///     .await?;
    /// println!("queued {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, request: DownloadRequest) -> Result<TaskId> {
        if !self.runtime.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        validate_url(&request.url)?;

        let id = TaskId::new();
        let task = Task::from_request(id.clone(), request);
        tracing::info!(task_id = %id, url = %task.url, priority = ?task.priority, "Task submitted");

        self.registry.insert(task).await;
        self.queue.push(id.clone());
        self.notify(&id).await;
        Ok(id)
    }

    /// Load the previous session's snapshots into the registry.
    ///
    /// Tasks interrupted mid-transfer are demoted to QUEUED with a fresh retry
    /// budget. Tasks waiting on a retry are queued with their count intact.
    /// Paused tasks stay paused. An active record whose id is also in history
    /// is stale and dropped. Read failures are logged and treated as empty.
    pub(crate) async fn restore_state(&self) {
        let store = &self.persistence.store;
        let active = store.load_active().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load active snapshot, starting empty");
            Vec::new()
        });
        let mut history = store.load_history().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load history snapshot, starting empty");
            Vec::new()
        });

        // History is rewritten on every retire, so it is never older than
        // an active entry for the same id
        let finished: HashSet<TaskId> = history.iter().map(|t| t.id.clone()).collect();

        let mut restored = Vec::with_capacity(active.len());
        let mut requeue = Vec::new();
        let mut superseded = 0;
        for mut task in active {
            if finished.contains(&task.id) {
                tracing::debug!(task_id = %task.id, status = %task.status, "Dropping stale active record of a finished task");
                superseded += 1;
                continue;
            }
            match task.status {
                Status::Downloading => {
                    task.status = Status::Queued;
                    task.retry_count = 0;
                }
                Status::Failed => task.status = Status::Queued,
                Status::Completed | Status::Cancelled => {
                    history.push(task);
                    continue;
                }
                Status::Queued | Status::Paused => {}
            }
            task.speed = 0.0;
            if task.status == Status::Queued {
                requeue.push((task.start_time, task.id.clone()));
            }
            restored.push(task);
        }

        let active_count = restored.len();
        let history_count = history.len();
        self.registry.restore(restored, history).await;

        // Started tasks first, in the order they originally started
        requeue.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.1.cmp(&b.1),
        });
        let requeued = requeue.len();
        for (_, id) in requeue {
            self.queue.push(id);
        }

        if active_count + history_count > 0 {
            tracing::info!(
                active = active_count,
                requeued,
                superseded,
                history = history_count,
                "Restored tasks from previous session"
            );
        }
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let parsed =
        url::Url::parse(raw).map_err(|e| Error::InvalidRequest(format!("invalid URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidRequest(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}
