//! FIFO dispatch queue feeding the worker pool.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::types::TaskId;

/// FIFO of task ids waiting for a worker.
///
/// The queue holds ids only. Whether an id is still runnable is decided by the
/// worker that pops it, through a registry transition, so duplicates and
/// stale ids are harmless.
#[derive(Default)]
pub struct DispatchQueue {
    items: Mutex<VecDeque<TaskId>>,
    available: Notify,
}

impl DispatchQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id and wake one waiting worker
    pub fn push(&self, id: TaskId) {
        if let Ok(mut items) = self.items.lock() {
            items.push_back(id);
        }
        self.available.notify_one();
    }

    /// Remove every occurrence of `id`; returns whether any was removed
    pub fn remove(&self, id: &TaskId) -> bool {
        match self.items.lock() {
            Ok(mut items) => {
                let before = items.len();
                items.retain(|queued| queued != id);
                items.len() != before
            }
            Err(_) => false,
        }
    }

    /// Number of ids waiting
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// Whether no ids are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn try_pop(&self) -> Option<TaskId> {
        self.items.lock().ok()?.pop_front()
    }

    /// Wait for the next id; `None` once `shutdown` is cancelled
    pub async fn pop(&self, shutdown: &CancellationToken) -> Option<TaskId> {
        loop {
            // Register interest before checking so a push between the check
            // and the await is not missed
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if shutdown.is_cancelled() {
                return None;
            }
            if let Some(id) = self.try_pop() {
                return Some(id);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = shutdown.cancelled() => return None,
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn pops_in_fifo_order() {
        let queue = DispatchQueue::new();
        let token = CancellationToken::new();
        let ids: Vec<TaskId> = (0..3).map(|i| TaskId::from(format!("t{i}"))).collect();
        for id in &ids {
            queue.push(id.clone());
        }
        for id in &ids {
            assert_eq!(queue.pop(&token).await.as_ref(), Some(id));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(DispatchQueue::new());
        let token = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.pop(&token).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.push(TaskId::from("late"));
        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, Some(TaskId::from("late")));
    }

    #[tokio::test]
    async fn cancellation_releases_waiting_pop() {
        let queue = Arc::new(DispatchQueue::new());
        let token = CancellationToken::new();
        let waiter = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.pop(&token).await })
        };
        token.cancel();
        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, None);
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let queue = DispatchQueue::new();
        queue.push(TaskId::from("a"));
        queue.push(TaskId::from("b"));
        queue.push(TaskId::from("a"));
        assert!(queue.remove(&TaskId::from("a")));
        assert_eq!(queue.len(), 1);
        assert!(!queue.remove(&TaskId::from("a")));
    }
}
