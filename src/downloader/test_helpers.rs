//! Shared test helpers for creating DownloadManager instances in tests.

use crate::config::Config;
use crate::downloader::DownloadManager;
use crate::types::{DownloadRequest, Status, TaskId};
use std::time::Duration;
use tempfile::tempdir;

/// Config rooted in `root` with intervals short enough for tests
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = root.join("downloads");
    config.download.max_concurrent_downloads = 3;
    config.download.chunk_size = 16 * 1024;
    config.download.timeout = Duration::from_secs(10);
    config.persistence.state_dir = root.join("state");
    config.persistence.state_save_interval = Duration::from_millis(200);
    config.retry.max_attempts = 3;
    config.retry.base_delay = Duration::from_millis(20);
    config.notifications.notify_interval = Duration::from_millis(50);
    config
}

/// Helper to create a test DownloadManager with state and downloads in a temp dir.
/// Returns the manager and the tempdir (which must be kept alive).
///
/// Workers are not started.
pub(crate) async fn create_test_manager() -> (DownloadManager, tempfile::TempDir) {
    create_test_manager_with(|_| {}).await
}

/// Like [`create_test_manager`], applying `customize` to the config first
pub(crate) async fn create_test_manager_with(
    customize: impl FnOnce(&mut Config),
) -> (DownloadManager, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    customize(&mut config);
    let manager = DownloadManager::new(config).await.unwrap();
    (manager, temp_dir)
}

/// Request for `url` with everything else defaulted
pub(crate) fn request(url: &str) -> DownloadRequest {
    DownloadRequest {
        url: url.to_string(),
        ..Default::default()
    }
}

/// Poll until the task reaches `status`, panicking after `timeout`
pub(crate) async fn wait_for_status(
    manager: &DownloadManager,
    id: &TaskId,
    status: Status,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let current = manager.registry.status(id).await;
        if current == Some(status) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} never reached {status}, last seen {current:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the task has been moved to history, returning its final record
pub(crate) async fn wait_for_history(
    manager: &DownloadManager,
    id: &TaskId,
    timeout: Duration,
) -> crate::types::Task {
    let deadline = tokio::time::Instant::now() + timeout;
    while !manager.registry.in_history(id).await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} never reached history"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    manager.registry.get(id).await.unwrap()
}

/// Force a task into `status`, bypassing transition rules
pub(crate) async fn force_status(manager: &DownloadManager, id: &TaskId, status: Status) {
    manager
        .registry
        .transition(id, |_| true, |t| t.status = status)
        .await
        .unwrap();
}
