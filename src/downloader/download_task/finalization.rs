//! Download finalization -- completion, stop handling, failure and retry scheduling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::categorize::category_for;
use crate::error::TransferError;
use crate::retry::{IsRetryable, next_retry_delay};
use crate::types::{Status, Task, TaskId};
use crate::utils::{get_unique_path, sanitize_category};

use super::super::DownloadManager;
use super::super::control::remove_partial;
use super::context::{AttemptPlan, DownloadTaskContext, StopReason};

/// Move the partial file into place and retire the task as COMPLETED.
///
/// If a pause or cancel wins the status transition, the file is moved back
/// to its partial path and the stop is handled as usual.
pub(super) async fn finalize_completed(
    ctx: &DownloadTaskContext,
    task: &Task,
    plan: &AttemptPlan,
    total: u64,
) {
    let download_dir = &ctx.config().download.download_dir;
    // The hint names a directory, so it is reduced to one path component
    let category = task
        .category
        .as_deref()
        .and_then(sanitize_category)
        .unwrap_or_else(|| category_for(&plan.filename).to_string());
    let dir = if ctx.config().download.category_subdirs {
        download_dir.join(&category)
    } else {
        download_dir.clone()
    };

    let destination = match resolve_destination(&dir, &plan.filename).await {
        Ok(path) => path,
        Err(e) => {
            handle_failure(ctx, e, Some(&plan.temp_path)).await;
            return;
        }
    };

    // Only this worker touches the partial file, so it moves before the status flips
    if let Err(source) = tokio::fs::rename(&plan.temp_path, &destination).await {
        let e = TransferError::File {
            path: destination,
            source,
        };
        handle_failure(ctx, e, Some(&plan.temp_path)).await;
        return;
    }

    let completed = ctx
        .manager
        .registry
        .transition(
            &ctx.id,
            |t| t.status == Status::Downloading,
            |t| {
                t.status = Status::Completed;
                t.total_size = total;
                t.set_downloaded(total);
                t.progress = 100.0;
                t.speed = 0.0;
                t.error = None;
                t.category = Some(category.clone());
                t.file_path = Some(destination.clone());
                t.temp_path = None;
                t.mark_ended();
            },
        )
        .await;

    match completed {
        Ok(()) => {
            if let Some(done) = ctx.manager.registry.retire(&ctx.id).await {
                ctx.manager.notifier.publish(&done);
                tracing::info!(
                    task_id = %ctx.id,
                    path = %destination.display(),
                    size = total,
                    duration = done.duration.unwrap_or_default(),
                    category = %category,
                    "Download completed"
                );
            }
            ctx.manager.spawn_retire_save();
        }
        Err(e) => {
            // A pause or cancel landed first; the bytes go back to being its partial file
            if let Err(err) = tokio::fs::rename(&destination, &plan.temp_path).await {
                tracing::warn!(
                    task_id = %ctx.id,
                    path = %destination.display(),
                    error = %err,
                    "Failed to move finished bytes back to the partial file"
                );
            }
            handle_stop(ctx, e.into(), Some(&plan.temp_path)).await;
        }
    }
}

async fn resolve_destination(dir: &Path, filename: &str) -> Result<PathBuf, TransferError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| TransferError::File {
            path: dir.to_path_buf(),
            source,
        })?;
    let wanted = dir.join(filename);
    get_unique_path(&wanted).map_err(|e| TransferError::File {
        path: wanted,
        source: std::io::Error::other(e.to_string()),
    })
}

/// Settle an attempt that stopped without finishing.
///
/// Pause and shutdown keep the partial file. A cancelled or vanished task
/// is no longer anyone's, so its partial file is removed here.
pub(super) async fn handle_stop(
    ctx: &DownloadTaskContext,
    reason: StopReason,
    temp_path: Option<&Path>,
) {
    let reason = match reason {
        // Shutdown does not look at the status; a cancel may have raced it
        StopReason::Shutdown => match ctx.manager.registry.status(&ctx.id).await {
            Some(Status::Cancelled) => StopReason::Status(Status::Cancelled),
            None => StopReason::Gone,
            Some(_) => StopReason::Shutdown,
        },
        other => other,
    };

    match reason {
        StopReason::Shutdown => {
            tracing::debug!(task_id = %ctx.id, "Transfer interrupted by shutdown");
        }
        StopReason::Status(Status::Paused) => {
            tracing::debug!(task_id = %ctx.id, "Transfer stopped for pause");
        }
        StopReason::Status(Status::Cancelled) | StopReason::Gone => {
            tracing::debug!(task_id = %ctx.id, "Transfer stopped for cancel");
            if let Some(path) = temp_path {
                remove_partial(&ctx.id, path).await;
            }
        }
        StopReason::Status(other) => {
            tracing::debug!(task_id = %ctx.id, status = %other, "Transfer stopped");
        }
    }
}

/// Record a failed attempt, then either schedule a retry or fail for good.
///
/// Every failed attempt counts against `retry.max_attempts`. A permanent
/// failure removes the partial file and retires the task.
pub(super) async fn handle_failure(
    ctx: &DownloadTaskContext,
    error: TransferError,
    temp_path: Option<&Path>,
) {
    let retryable = error.is_retryable();
    let message = error.to_string();
    let retry_config = &ctx.config().retry;

    let recorded = ctx
        .manager
        .registry
        .transition(
            &ctx.id,
            |t| t.status == Status::Downloading,
            |t| {
                t.retry_count += 1;
                t.status = Status::Failed;
                t.speed = 0.0;
                t.error = Some(message.clone());
                let delay = if retryable {
                    next_retry_delay(retry_config, t.retry_count)
                } else {
                    None
                };
                if delay.is_none() {
                    t.mark_ended();
                }
                (delay, t.retry_count)
            },
        )
        .await;

    let (delay, attempts) = match recorded {
        Ok(outcome) => outcome,
        Err(e) => {
            // A control operation moved the task first; its outcome wins
            tracing::debug!(task_id = %ctx.id, error = %message, "Discarding failure of a stopped transfer");
            handle_stop(ctx, e.into(), temp_path).await;
            return;
        }
    };

    match delay {
        Some(delay) => {
            tracing::warn!(
                task_id = %ctx.id,
                attempt = attempts,
                max_attempts = retry_config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "Transfer attempt failed, retrying"
            );
            ctx.manager.notify(&ctx.id).await;
            schedule_retry(ctx.manager.clone(), ctx.id.clone(), delay);
        }
        None => {
            tracing::error!(
                task_id = %ctx.id,
                attempts,
                retryable,
                error = %message,
                "Download failed"
            );
            if let Some(path) = temp_path {
                remove_partial(&ctx.id, path).await;
            }
            if let Some(failed) = ctx.manager.registry.retire(&ctx.id).await {
                ctx.manager.notifier.publish(&failed);
            }
            ctx.manager.spawn_retire_save();
        }
    }
}

/// After `delay`, put a task still waiting in FAILED back on the queue.
///
/// The timer is detached so the worker is free for other tasks meanwhile.
/// A resume or cancel during the wait takes precedence, and shutdown drops
/// the timer, leaving the task FAILED for the next start to requeue.
pub(super) fn schedule_retry(manager: DownloadManager, id: TaskId, delay: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = manager.runtime.shutdown.cancelled() => return,
        }

        let requeued = manager
            .registry
            .transition(
                &id,
                |t| t.status == Status::Failed,
                |t| t.status = Status::Queued,
            )
            .await
            .is_ok();
        if requeued {
            tracing::debug!(task_id = %id, "Retry delay elapsed, task requeued");
            manager.queue.push(id.clone());
            manager.notify(&id).await;
        }
    });
}
