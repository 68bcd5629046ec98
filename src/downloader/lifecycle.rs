//! Startup and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::DownloadManager;

/// How long shutdown waits for workers to reach a chunk boundary
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl DownloadManager {
    /// Spawn the worker pool and the periodic snapshot timer
    ///
    /// Calling this more than once has no further effect.
    pub async fn start(&self) {
        if self.runtime.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Download manager already started");
            return;
        }

        let mut handles = self.runtime.handles.lock().await;
        handles.extend(self.spawn_workers());
        handles.push(self.spawn_state_saver());

        tracing::info!(
            workers = self.config.download.max_concurrent_downloads,
            queued = self.queue.len(),
            "Download manager started"
        );
    }

    /// Whether new submissions are still accepted
    pub fn is_accepting(&self) -> bool {
        self.runtime.accepting_new.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the manager
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Signals workers, retry timers and the snapshot timer to stop
    /// 3. Waits for workers to reach a chunk boundary (30 second timeout)
    /// 4. Writes the final active and history snapshots
    ///
    /// Interrupted transfers stay DOWNLOADING in the snapshot, so the next
    /// start requeues them and resumes from their partial files.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.runtime.accepting_new.store(false, Ordering::SeqCst);
        self.runtime.shutdown.cancel();

        let handles: Vec<_> = self.runtime.handles.lock().await.drain(..).collect();
        let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(handles)).await;
        match joined {
            Ok(results) => {
                let panicked = results.iter().filter(|r| r.is_err()).count();
                if panicked > 0 {
                    tracing::warn!(panicked, "Background tasks ended abnormally");
                } else {
                    tracing::info!("All workers stopped");
                }
            }
            Err(_) => {
                tracing::warn!(
                    running = self.runtime.running_count(),
                    "Timeout waiting for workers to stop, proceeding with shutdown"
                );
            }
        }

        if self.save_state().await.is_err() {
            tracing::warn!("Final snapshot incomplete; the previous snapshot stays in place");
        }
        tracing::info!("Graceful shutdown complete");
    }
}
