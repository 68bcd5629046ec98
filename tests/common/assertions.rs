//! Waiting helpers and custom assertions for integration tests

use std::time::Duration;
use remote_dl::{DownloadManager, Status, Task, TaskFilter, TaskId};

/// Poll until `id` reaches a final status, returning its record
///
/// Panics after `timeout`.
pub async fn wait_for_final(manager: &DownloadManager, id: &TaskId, timeout: Duration) -> Task {
    wait_for(manager, id, timeout, |t| t.status.is_final() && t.end_time.is_some()).await
}

/// Poll until `id` is in `status`, returning its record
pub async fn wait_for_status(
    manager: &DownloadManager,
    id: &TaskId,
    status: Status,
    timeout: Duration,
) -> Task {
    wait_for(manager, id, timeout, |t| t.status == status).await
}

async fn wait_for(
    manager: &DownloadManager,
    id: &TaskId,
    timeout: Duration,
    done: impl Fn(&Task) -> bool,
) -> Task {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = manager.get(id).await.expect("task should exist");
        if done(&task) {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting on task {id}, last status {}",
            task.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Ids of every task in a listing
pub async fn listed_ids(manager: &DownloadManager, filter: &TaskFilter) -> Vec<TaskId> {
    manager
        .list(filter, usize::MAX, 0)
        .await
        .items
        .into_iter()
        .map(|t| t.id)
        .collect()
}

/// Assert a completed task's counters and final file agree with `expected`
pub fn assert_completed_with(task: &Task, expected: &[u8]) {
    assert_eq!(task.status, Status::Completed, "task {} not completed", task.id);
    assert_eq!(task.progress, 100.0);
    assert_eq!(task.total_size, expected.len() as u64);
    assert_eq!(task.downloaded_size, task.total_size);
    let path = task.file_path.as_ref().expect("completed task has a final path");
    let written = std::fs::read(path).expect("final file should exist");
    assert!(written == expected, "final file content differs from the source");
}
