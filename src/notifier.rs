//! Rate-limited push of task deltas to subscribers.
//!
//! Final statuses and status changes always go out. Progress-only updates for
//! a task are dropped until `interval` has passed since that task's last
//! broadcast.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::types::{Status, Task, TaskId, TaskUpdate};

/// A live subscription; dropping it unsubscribes on the next broadcast
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TaskUpdate>,
}

impl Subscription {
    /// Subscriber id, for logging
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next update; `None` once the notifier is gone
    pub async fn recv(&mut self) -> Option<TaskUpdate> {
        self.rx.recv().await
    }

    /// Take an already-delivered update without waiting
    pub fn try_recv(&mut self) -> Option<TaskUpdate> {
        self.rx.try_recv().ok()
    }

    /// Unwrap into the raw receiver (for stream adapters)
    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<TaskUpdate> {
        self.rx
    }
}

struct LastSent {
    at: Instant,
    status: Status,
}

/// Subscriber registry plus per-task throttle state
pub struct Notifier {
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<TaskUpdate>>>,
    next_id: AtomicU64,
    last_sent: Mutex<HashMap<TaskId, LastSent>>,
    interval: Duration,
}

impl Notifier {
    /// Create a notifier throttling progress updates to one per `interval` per task
    pub fn new(interval: Duration) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_sent: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.insert(id, tx);
        }
        tracing::debug!(subscriber_id = id, "Subscriber connected");
        Subscription { id, rx }
    }

    /// Number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Publish the task's current state if the throttle allows it.
    ///
    /// Returns whether the update was broadcast.
    pub fn publish(&self, task: &Task) -> bool {
        if !self.should_send(&task.id, task.status) {
            return false;
        }
        self.broadcast(TaskUpdate::from(task));
        true
    }

    fn should_send(&self, id: &TaskId, status: Status) -> bool {
        let Ok(mut last_sent) = self.last_sent.lock() else {
            return true;
        };

        if status.is_final() {
            // Nothing follows a final status except a resume, which is a status change
            last_sent.remove(id);
            return true;
        }

        let now = Instant::now();
        let due = last_sent.get(id).is_none_or(|last| {
            last.status != status || now.duration_since(last.at) >= self.interval
        });
        if due {
            last_sent.insert(id.clone(), LastSent { at: now, status });
        }
        due
    }

    fn broadcast(&self, update: TaskUpdate) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|sub_id, tx| {
            let delivered = tx.send(update.clone()).is_ok();
            if !delivered {
                tracing::debug!(subscriber_id = *sub_id, "Removing closed subscriber");
            }
            delivered
        });
    }
}
