//! Worker pool draining the dispatch queue.

use chrono::Utc;

use super::DownloadManager;
use super::download_task::{DownloadTaskContext, run_download_task};
use crate::types::{Status, TaskId};

impl DownloadManager {
    /// Spawn `max_concurrent_downloads` worker loops
    ///
    /// Each worker pops one id, claims it, drives it through the executor to
    /// completion, and only then pops the next. The pool size is therefore the
    /// bound on simultaneous transfers.
    pub(crate) fn spawn_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.download.max_concurrent_downloads)
            .map(|worker| {
                let manager = self.clone();
                tokio::spawn(async move { manager.worker_loop(worker).await })
            })
            .collect()
    }

    async fn worker_loop(self, worker: usize) {
        tracing::debug!(worker, "Worker started");
        while let Some(id) = self.queue.pop(&self.runtime.shutdown).await {
            if !self.claim(&id).await {
                tracing::debug!(worker, task_id = %id, "Dropping dequeued task that is not runnable");
                continue;
            }

            tracing::debug!(worker, task_id = %id, "Worker picked up task");
            run_download_task(DownloadTaskContext::new(self.clone(), id.clone())).await;
            self.release(&id).await;
        }
        tracing::debug!(worker, "Worker stopped");
    }

    /// QUEUED -> DOWNLOADING, unless another worker still owns the id
    pub(super) async fn claim(&self, id: &TaskId) -> bool {
        let running = &self.runtime.running;
        let claimed = self
            .registry
            .transition(
                id,
                |t| {
                    t.status == Status::Queued
                        && running.lock().map(|r| !r.contains(&t.id)).unwrap_or(false)
                },
                |t| {
                    t.status = Status::Downloading;
                    t.speed = 0.0;
                    t.start_time.get_or_insert_with(Utc::now);
                    if let Ok(mut r) = running.lock() {
                        r.insert(t.id.clone());
                    }
                },
            )
            .await
            .is_ok();

        if claimed {
            self.notify(id).await;
        }
        claimed
    }

    /// Give up ownership; requeue if the task was resumed while we wound down
    pub(super) async fn release(&self, id: &TaskId) {
        if let Ok(mut r) = self.runtime.running.lock() {
            r.remove(id);
        }
        // A resume that raced our stop had its queue entry dropped by claim()
        if !self.runtime.shutdown.is_cancelled()
            && self.registry.status(id).await == Some(Status::Queued)
        {
            self.queue.push(id.clone());
        }
    }
}
