//! Task registry: the active and history partitions and per-task locking.
//!
//! Every status change goes through [`TaskRegistry::transition`]. A task lives
//! in exactly one partition; [`TaskRegistry::retire`] moves it under the
//! structural write lock, so no reader ever sees it in both or in neither.
//!
//! Lock order is structural lock first, task lock second. Task locks are only
//! taken while a structural guard is held and are never held across an
//! `.await` other than their own acquisition.

use std::cmp::Ordering;
use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};

use crate::error::DownloadError;
use crate::types::{Status, Task, TaskCounts, TaskFilter, TaskId, TaskPage};

/// Why a transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The id is in neither partition
    NotFound,
    /// The predicate rejected the current status, or the task is already retired
    InvalidState {
        /// Status at the time of the attempt
        current: Status,
    },
}

impl TransitionError {
    /// Attach the task id and operation name for reporting to a caller
    pub fn into_download_error(self, id: &TaskId, operation: &str) -> DownloadError {
        match self {
            TransitionError::NotFound => DownloadError::NotFound { id: id.clone() },
            TransitionError::InvalidState { current } => DownloadError::InvalidState {
                id: id.clone(),
                operation: operation.to_string(),
                current_state: current.to_string(),
            },
        }
    }
}

#[derive(Default)]
struct Partitions {
    active: HashMap<TaskId, Mutex<Task>>,
    history: HashMap<TaskId, Task>,
}

/// Owns every task known to the process
pub struct TaskRegistry {
    partitions: RwLock<Partitions>,
    history_max_count: usize,
}

impl TaskRegistry {
    /// Create an empty registry keeping at most `history_max_count` finished tasks
    pub fn new(history_max_count: usize) -> Self {
        Self {
            partitions: RwLock::new(Partitions::default()),
            history_max_count: history_max_count.max(1),
        }
    }

    /// Add a new task to the active partition, creating its lock
    pub async fn insert(&self, task: Task) {
        let mut parts = self.partitions.write().await;
        parts.history.remove(&task.id);
        parts.active.insert(task.id.clone(), Mutex::new(task));
    }

    /// Look up a task in the active partition, then in history
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let parts = self.partitions.read().await;
        if let Some(slot) = parts.active.get(id) {
            return Some(slot.lock().await.clone());
        }
        parts.history.get(id).cloned()
    }

    /// Current status without cloning the record
    pub async fn status(&self, id: &TaskId) -> Option<Status> {
        let parts = self.partitions.read().await;
        if let Some(slot) = parts.active.get(id) {
            return Some(slot.lock().await.status);
        }
        parts.history.get(id).map(|t| t.status)
    }

    /// Whether the id is in the active partition
    pub async fn is_active(&self, id: &TaskId) -> bool {
        self.partitions.read().await.active.contains_key(id)
    }

    /// Whether the id is in the history partition
    pub async fn in_history(&self, id: &TaskId) -> bool {
        self.partitions.read().await.history.contains_key(id)
    }

    /// Apply `mutation` to an active task if `allowed` accepts it.
    ///
    /// The check and the mutation happen under the task's lock, so they are
    /// atomic with respect to every other transition of that task. A task in
    /// history rejects every transition with its final status.
    pub async fn transition<P, M, R>(
        &self,
        id: &TaskId,
        allowed: P,
        mutation: M,
    ) -> Result<R, TransitionError>
    where
        P: FnOnce(&Task) -> bool,
        M: FnOnce(&mut Task) -> R,
    {
        let parts = self.partitions.read().await;
        let Some(slot) = parts.active.get(id) else {
            return Err(match parts.history.get(id) {
                Some(task) => TransitionError::InvalidState {
                    current: task.status,
                },
                None => TransitionError::NotFound,
            });
        };

        let mut task = slot.lock().await;
        if !allowed(&task) {
            return Err(TransitionError::InvalidState {
                current: task.status,
            });
        }
        Ok(mutation(&mut task))
    }

    /// Move a task from active to history, dropping its lock.
    ///
    /// Returns the retired record, or `None` if the task was not active.
    /// Evicts the oldest history entries beyond the configured maximum.
    pub async fn retire(&self, id: &TaskId) -> Option<Task> {
        let mut parts = self.partitions.write().await;
        let task = parts.active.remove(id)?.into_inner();
        parts.history.insert(id.clone(), task.clone());

        while parts.history.len() > self.history_max_count {
            let Some(oldest) = parts
                .history
                .values()
                .min_by_key(|t| t.end_time)
                .map(|t| t.id.clone())
            else {
                break;
            };
            tracing::debug!(task_id = %oldest, "Evicting task from history");
            parts.history.remove(&oldest);
        }

        Some(task)
    }

    /// Delete a history entry
    pub async fn remove_history(&self, id: &TaskId) -> Option<Task> {
        self.partitions.write().await.history.remove(id)
    }

    /// Filtered, paginated view sorted by start time, newest first.
    ///
    /// Filtering on an in-flight status only scans the active partition.
    pub async fn list(&self, filter: &TaskFilter, limit: usize, offset: usize) -> TaskPage {
        let parts = self.partitions.read().await;
        let mut items = Vec::new();
        for slot in parts.active.values() {
            let task = slot.lock().await;
            if filter.matches(&task) {
                items.push(task.clone());
            }
        }
        if !filter.status.is_some_and(|s| s.is_in_flight()) {
            items.extend(parts.history.values().filter(|t| filter.matches(t)).cloned());
        }
        drop(parts);

        items.sort_by(compare_newest_first);
        let total = items.len();
        let items = items.into_iter().skip(offset).take(limit).collect();
        TaskPage { items, total }
    }

    /// Copies of every active task
    pub async fn active_snapshot(&self) -> Vec<Task> {
        let parts = self.partitions.read().await;
        let mut tasks = Vec::with_capacity(parts.active.len());
        for slot in parts.active.values() {
            tasks.push(slot.lock().await.clone());
        }
        tasks
    }

    /// Copies of every history entry
    pub async fn history_snapshot(&self) -> Vec<Task> {
        self.partitions
            .read()
            .await
            .history
            .values()
            .cloned()
            .collect()
    }

    /// Load persisted partitions, keeping only the newest history entries
    pub async fn restore(&self, active: Vec<Task>, mut history: Vec<Task>) {
        history.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        history.truncate(self.history_max_count);

        let mut parts = self.partitions.write().await;
        for task in history {
            parts.history.insert(task.id.clone(), task);
        }
        for task in active {
            parts.history.remove(&task.id);
            parts.active.insert(task.id.clone(), Mutex::new(task));
        }
    }

    /// Partition sizes and in-flight counts
    pub async fn counts(&self) -> TaskCounts {
        let parts = self.partitions.read().await;
        let mut counts = TaskCounts {
            active: parts.active.len(),
            history: parts.history.len(),
            ..Default::default()
        };
        for slot in parts.active.values() {
            match slot.lock().await.status {
                Status::Queued => counts.queued += 1,
                Status::Downloading => counts.downloading += 1,
                _ => {}
            }
        }
        counts
    }
}

// Started tasks first, newest start first; unstarted tasks last
fn compare_newest_first(a: &Task, b: &Task) -> Ordering {
    match (a.start_time, b.start_time) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}
