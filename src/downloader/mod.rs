//! Core download manager split into focused submodules.
//!
//! The `DownloadManager` struct and its methods are organized by domain:
//! - [`queue`] - Submission and startup recovery
//! - [`query`] - Task lookup, listing and file descriptors
//! - [`control`] - Task lifecycle control (pause/resume/cancel)
//! - [`queue_processor`] - Worker pool draining the dispatch queue
//! - [`download_task`] - Resumable transfer execution
//! - [`background_tasks`] - Periodic and on-completion snapshots
//! - [`lifecycle`] - Startup and shutdown coordination

mod background_tasks;
mod control;
mod download_task;
mod lifecycle;
mod query;
mod queue;
mod queue_processor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::DispatchQueue;
use crate::error::{Error, Result};
use crate::notifier::{Notifier, Subscription};
use crate::persistence::{JsonSnapshotStore, SnapshotStore};
use crate::registry::TaskRegistry;
use crate::types::TaskId;

pub use query::DEFAULT_LIST_LIMIT;

/// Worker and shutdown bookkeeping
#[derive(Clone)]
pub(crate) struct RuntimeState {
    /// Cancelled once on shutdown; observed by workers, backoff timers and the snapshot timer
    pub(crate) shutdown: CancellationToken,
    /// Whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Whether `start()` already spawned the workers
    pub(crate) started: Arc<AtomicBool>,
    /// Ids currently owned by a worker; a task's files are only touched by its owner
    pub(crate) running: Arc<std::sync::Mutex<HashSet<TaskId>>>,
    /// Background task handles joined on shutdown
    pub(crate) handles: Arc<tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

impl RuntimeState {
    fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            started: Arc::new(AtomicBool::new(false)),
            running: Arc::new(std::sync::Mutex::new(HashSet::new())),
            handles: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn is_running(&self, id: &TaskId) -> bool {
        self.running.lock().map(|r| r.contains(id)).unwrap_or(false)
    }

    pub(crate) fn running_count(&self) -> usize {
        self.running.lock().map(|r| r.len()).unwrap_or(0)
    }
}

/// Snapshot writers, serialized so a later write never loses to an earlier one
#[derive(Clone)]
pub(crate) struct PersistenceState {
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) active_write: Arc<tokio::sync::Mutex<()>>,
    pub(crate) history_write: Arc<tokio::sync::Mutex<()>>,
}

/// The download manager (cloneable - all fields are Arc-wrapped)
///
/// One instance owns every task of the process. Construct it with
/// [`DownloadManager::new`], call [`DownloadManager::start`] to spawn the
/// workers, and [`DownloadManager::shutdown`] to drain.
#[derive(Clone)]
pub struct DownloadManager {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Active and history partitions
    pub(crate) registry: Arc<TaskRegistry>,
    /// FIFO of ids waiting for a worker
    pub(crate) queue: Arc<DispatchQueue>,
    /// Subscriber fan-out with per-task throttling
    pub(crate) notifier: Arc<Notifier>,
    /// Shared HTTP client carrying the per-attempt timeout
    pub(crate) http: reqwest::Client,
    /// Snapshot storage
    pub(crate) persistence: PersistenceState,
    /// Worker and shutdown bookkeeping
    pub(crate) runtime: RuntimeState,
}

impl DownloadManager {
    /// Create a manager persisting JSON snapshots under `persistence.state_dir`.
    ///
    /// Restores the previous session's tasks before returning. Workers are not
    /// running until [`DownloadManager::start`] is called.
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(JsonSnapshotStore::new(&config.persistence.state_dir));
        Self::with_store(config, store).await
    }

    /// Create a manager backed by a custom snapshot store
    pub async fn with_store(config: Config, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let http = reqwest::Client::builder()
            .timeout(config.download.timeout)
            .user_agent(config.download.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {}", e),
                key: None,
            })?;

        let manager = Self {
            registry: Arc::new(TaskRegistry::new(config.persistence.history_max_count)),
            queue: Arc::new(DispatchQueue::new()),
            notifier: Arc::new(Notifier::new(config.notifications.notify_interval)),
            http,
            persistence: PersistenceState {
                store,
                active_write: Arc::new(tokio::sync::Mutex::new(())),
                history_write: Arc::new(tokio::sync::Mutex::new(())),
            },
            runtime: RuntimeState::new(),
            config: Arc::new(config),
        };

        manager.restore_state().await;
        Ok(manager)
    }

    /// Subscribe to task updates
    ///
    /// Every subscriber receives every broadcast update. A dropped
    /// subscription is cleaned up on the next broadcast.
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Publish the task's current state to subscribers, subject to throttling
    pub(crate) async fn notify(&self, id: &TaskId) {
        if let Some(task) = self.registry.get(id).await {
            self.notifier.publish(&task);
        }
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
