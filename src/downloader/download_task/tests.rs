use std::path::{Path, PathBuf};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::downloader::test_helpers::*;
use crate::persistence::SnapshotStore;
use crate::types::{DownloadRequest, Status, TaskId};

const WAIT: Duration = Duration::from_secs(10);

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Serves `body`, honoring `Range: bytes=N-`
struct RangeResponder {
    body: Vec<u8>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.body.len();
        let start = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.trim_end_matches('-').parse::<usize>().ok());

        match start {
            Some(start) if start >= len => ResponseTemplate::new(416)
                .insert_header("content-range", format!("bytes */{}", len)),
            Some(start) => ResponseTemplate::new(206)
                .insert_header(
                    "content-range",
                    format!("bytes {}-{}/{}", start, len - 1, len),
                )
                .set_body_bytes(self.body[start..].to_vec()),
            None => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        }
    }
}

/// Where the executor keeps `filename` in flight for task `id`
fn partial_for(root: &Path, filename: &str, id: &TaskId) -> PathBuf {
    crate::utils::partial_path(&root.join("downloads"), filename, id)
}

fn range_header(request: &Request) -> Option<String> {
    request
        .headers
        .get("range")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[tokio::test]
async fn test_completed_file_moves_into_category_dir() {
    let server = MockServer::start().await;
    let content = body(200 * 1024);
    Mock::given(method("GET"))
        .and(path("/media/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/media/clip.mp4", server.uri())))
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.progress, 100.0);
    assert_eq!(task.total_size, content.len() as u64);
    assert_eq!(task.downloaded_size, content.len() as u64);
    assert_eq!(task.category.as_deref(), Some("video"));
    assert!(task.end_time.is_some());
    assert!(task.duration.is_some());

    let expected = temp_dir.path().join("downloads/video/clip.mp4");
    assert_eq!(task.file_path.as_deref(), Some(expected.as_path()));
    assert_eq!(std::fs::read(&expected).unwrap(), content);
    assert!(!partial_for(temp_dir.path(), "clip.mp4", &id).exists());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_request_filename_and_category_override_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body(1024)))
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager_with(|c| c.download.category_subdirs = false).await;
    manager.start().await;
    let id = manager
        .submit(DownloadRequest {
            url: format!("{}/download?id=7", server.uri()),
            filename: Some("report.pdf".into()),
            category: Some("work".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.category.as_deref(), Some("work"));
    // Subdirectories disabled: straight into the download dir
    assert!(temp_dir.path().join("downloads/report.pdf").exists());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_name_collision_gets_numbered_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body(512)))
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    let existing = temp_dir.path().join("downloads/document");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("notes.txt"), b"already here").unwrap();

    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/notes.txt", server.uri())))
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.file_path, Some(existing.join("notes (1).txt")));
    assert_eq!(std::fs::read(existing.join("notes.txt")).unwrap(), b"already here");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_category_hint_stays_inside_download_dir() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body(256)))
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(DownloadRequest {
            url: format!("{}/a.txt", server.uri()),
            category: Some("../escaped".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    let downloads = temp_dir.path().join("downloads");
    assert_eq!(task.file_path, Some(downloads.join("_escaped/a.txt")));
    assert_eq!(task.category.as_deref(), Some("_escaped"));
    assert!(!temp_dir.path().join("escaped").exists());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_same_named_tasks_keep_separate_partials() {
    let server = MockServer::start().await;
    let first = body(96 * 1024);
    let second: Vec<u8> = body(64 * 1024).into_iter().map(|b| b ^ 0x5A).collect();
    Mock::given(method("GET"))
        .and(path("/one/data.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(first.clone())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/two/data.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(second.clone())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let (manager, _temp_dir) = create_test_manager().await;
    manager.start().await;
    let a = manager
        .submit(request(&format!("{}/one/data.bin", server.uri())))
        .await
        .unwrap();
    let b = manager
        .submit(request(&format!("{}/two/data.bin", server.uri())))
        .await
        .unwrap();

    let a = wait_for_history(&manager, &a, WAIT).await;
    let b = wait_for_history(&manager, &b, WAIT).await;

    for task in [&a, &b] {
        assert_eq!(task.status, Status::Completed, "{:?}", task.error);
        assert_eq!(task.retry_count, 0);
    }
    assert_ne!(a.file_path, b.file_path);
    assert_eq!(std::fs::read(a.file_path.unwrap()).unwrap(), first);
    assert_eq!(std::fs::read(b.file_path.unwrap()).unwrap(), second);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_pause_before_completion_keeps_partial_in_place() {
    use super::context::{DownloadTaskContext, plan_attempt};
    use super::finalization::finalize_completed;

    let (manager, temp_dir) = create_test_manager().await;
    let id = manager
        .submit(request("http://example.com/late.bin"))
        .await
        .unwrap();
    let task = manager.get(&id).await.unwrap();
    let plan = plan_attempt(&manager.config, &task).await.unwrap();
    std::fs::write(&plan.temp_path, b"every byte").unwrap();
    // The last chunk landed, then a pause won the race to the registry
    force_status(&manager, &id, Status::Paused).await;

    let ctx = DownloadTaskContext::new(manager.clone(), id.clone());
    finalize_completed(&ctx, &task, &plan, 10).await;

    assert_eq!(manager.registry.status(&id).await, Some(Status::Paused));
    assert_eq!(std::fs::read(&plan.temp_path).unwrap(), b"every byte");
    assert!(!temp_dir.path().join("downloads/other/late.bin").exists());
}

#[tokio::test]
async fn test_resumes_from_partial_file_with_range_request() {
    let server = MockServer::start().await;
    let content = body(64 * 1024);
    Mock::given(method("GET"))
        .and(path("/data.bin"))
        .respond_with(RangeResponder {
            body: content.clone(),
        })
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    let id = manager
        .submit(request(&format!("{}/data.bin", server.uri())))
        .await
        .unwrap();
    let already = 10_000;
    std::fs::write(
        partial_for(temp_dir.path(), "data.bin", &id),
        &content[..already],
    )
    .unwrap();
    manager.start().await;

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(range_header(&requests[0]), Some(format!("bytes={}-", already)));

    let final_path = task.file_path.unwrap();
    assert_eq!(std::fs::read(final_path).unwrap(), content);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_server_ignoring_range_restarts_from_zero() {
    let server = MockServer::start().await;
    let content = body(8 * 1024);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    let id = manager
        .submit(request(&format!("{}/blob.bin", server.uri())))
        .await
        .unwrap();
    // Stale bytes that must not survive
    std::fs::write(partial_for(temp_dir.path(), "blob.bin", &id), vec![0xFF; 3000]).unwrap();
    manager.start().await;

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(std::fs::read(task.file_path.unwrap()).unwrap(), content);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_range_not_satisfiable_for_full_partial_completes() {
    let server = MockServer::start().await;
    let content = body(4096);
    Mock::given(method("GET"))
        .respond_with(RangeResponder {
            body: content.clone(),
        })
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    let id = manager
        .submit(request(&format!("{}/full.bin", server.uri())))
        .await
        .unwrap();
    std::fs::write(partial_for(temp_dir.path(), "full.bin", &id), &content).unwrap();
    manager.start().await;

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.total_size, 4096);
    assert_eq!(std::fs::read(task.file_path.unwrap()).unwrap(), content);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_resume_disabled_discards_partial() {
    let server = MockServer::start().await;
    let content = body(4096);
    Mock::given(method("GET"))
        .respond_with(RangeResponder {
            body: content.clone(),
        })
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager_with(|c| c.download.resume_support = false).await;
    let id = manager
        .submit(request(&format!("{}/fresh.bin", server.uri())))
        .await
        .unwrap();
    std::fs::write(partial_for(temp_dir.path(), "fresh.bin", &id), &content[..100]).unwrap();
    manager.start().await;

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(range_header(&requests[0]), None);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_server_error_exhausts_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/broken.iso", server.uri())))
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Failed);
    assert_eq!(task.retry_count, 3);
    assert!(task.error.as_deref().unwrap().contains("500"));
    assert!(task.end_time.is_some());
    assert!(!partial_for(temp_dir.path(), "broken.iso", &id).exists());

    manager.shutdown().await;
    // MockServer verifies `expect(3)` on drop
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let content = body(2048);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;

    let (manager, _temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/flaky.zip", server.uri())))
        .await
        .unwrap();

    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.retry_count, 1);
    assert_eq!(task.error, None);
    assert_eq!(std::fs::read(task.file_path.unwrap()).unwrap(), content);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_pause_while_waiting_for_response_keeps_task_active() {
    let server = MockServer::start().await;
    let content = body(4096);
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.clone())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let (manager, _temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/slow.bin", server.uri())))
        .await
        .unwrap();

    wait_for_status(&manager, &id, Status::Downloading, WAIT).await;
    manager.pause(&id).await.unwrap();

    // Let the delayed response arrive and the worker observe the pause
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(manager.registry.status(&id).await, Some(Status::Paused));
    assert!(manager.registry.is_active(&id).await);
    assert!(!manager.runtime.is_running(&id));

    manager.resume(&id).await.unwrap();
    let task = wait_for_history(&manager, &id, WAIT).await;
    assert_eq!(task.status, Status::Completed);
    assert_eq!(std::fs::read(task.file_path.unwrap()).unwrap(), content);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_cancel_during_transfer_removes_partial() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body(4096))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let (manager, temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/gone.bin", server.uri())))
        .await
        .unwrap();

    wait_for_status(&manager, &id, Status::Downloading, WAIT).await;
    manager.cancel(&id).await.unwrap();

    let task = manager.get(&id).await.unwrap();
    assert_eq!(task.status, Status::Cancelled);
    assert!(manager.registry.in_history(&id).await);

    // The worker removes the partial file once it observes the cancel
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(!manager.runtime.is_running(&id));
    assert!(!partial_for(temp_dir.path(), "gone.bin", &id).exists());
    assert!(!temp_dir.path().join("downloads/other/gone.bin").exists());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_leaves_transfer_downloading_for_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body(1024))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let (manager, _temp_dir) = create_test_manager().await;
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/long.bin", server.uri())))
        .await
        .unwrap();

    wait_for_status(&manager, &id, Status::Downloading, WAIT).await;
    tokio::time::timeout(Duration::from_secs(3), manager.shutdown())
        .await
        .expect("shutdown should not wait for the delayed response");

    assert_eq!(manager.registry.status(&id).await, Some(Status::Downloading));
    let saved = manager.persistence.store.load_active().await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status, Status::Downloading);
}

#[tokio::test]
async fn test_progress_updates_reach_subscribers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body(32 * 1024)))
        .mount(&server)
        .await;

    let (manager, _temp_dir) = create_test_manager().await;
    let mut sub = manager.subscribe();
    manager.start().await;
    let id = manager
        .submit(request(&format!("{}/watched.bin", server.uri())))
        .await
        .unwrap();

    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(200), sub.recv()).await {
            Ok(Some(update)) => {
                assert_eq!(update.task_id, id);
                let done = update.status == Status::Completed;
                seen.push(update.status);
                if done {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {}
        }
    }

    assert_eq!(seen.first(), Some(&Status::Queued));
    assert!(seen.contains(&Status::Downloading));
    assert_eq!(seen.last(), Some(&Status::Completed));

    manager.shutdown().await;
}
