//! Background snapshot writers: the periodic active-task timer and the
//! history rewrite triggered whenever a task finishes.

use crate::error::{Error, PersistenceError, Result};
use crate::types::Status;

use super::DownloadManager;

impl DownloadManager {
    /// Spawn the timer that snapshots active tasks every `state_save_interval`
    pub(crate) fn spawn_state_saver(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let period = self.config.persistence.state_save_interval;
        let shutdown = self.runtime.shutdown.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = manager.persist_active().await {
                            tracing::warn!(error = %e, "Periodic active snapshot failed");
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
            tracing::debug!("State saver stopped");
        })
    }

    /// Overwrite the active snapshot with every task not yet finished
    pub(crate) async fn persist_active(&self) -> std::result::Result<(), PersistenceError> {
        let _guard = self.persistence.active_write.lock().await;
        let tasks: Vec<_> = self
            .registry
            .active_snapshot()
            .await
            .into_iter()
            .filter(|t| !matches!(t.status, Status::Completed | Status::Cancelled))
            .collect();
        self.persistence.store.save_active(&tasks).await?;
        tracing::trace!(count = tasks.len(), "Active snapshot written");
        Ok(())
    }

    /// Overwrite the history snapshot, if history persistence is enabled
    pub(crate) async fn persist_history(&self) -> std::result::Result<(), PersistenceError> {
        if !self.config.persistence.save_history {
            return Ok(());
        }
        let _guard = self.persistence.history_write.lock().await;
        let tasks = self.registry.history_snapshot().await;
        self.persistence.store.save_history(&tasks).await?;
        tracing::trace!(count = tasks.len(), "History snapshot written");
        Ok(())
    }

    /// Rewrite both snapshots off the caller's path after a task is retired.
    ///
    /// History goes first; the active rewrite then drops the retired record
    /// so a crash never restores it as unfinished work.
    pub(crate) fn spawn_retire_save(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.persist_history().await {
                tracing::warn!(error = %e, "History snapshot failed");
            }
            if let Err(e) = manager.persist_active().await {
                tracing::warn!(error = %e, "Active snapshot failed");
            }
        });
    }

    /// Write both snapshots now.
    ///
    /// Both writes are always attempted; the first failure is returned.
    pub async fn save_state(&self) -> Result<()> {
        let active = self.persist_active().await;
        if let Err(e) = &active {
            tracing::error!(error = %e, "Failed to write active snapshot");
        }
        let history = self.persist_history().await;
        if let Err(e) = &history {
            tracing::error!(error = %e, "Failed to write history snapshot");
        }
        active.and(history).map_err(Error::Persistence)
    }
}
