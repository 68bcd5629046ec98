//! Download task orchestration -- top-level lifecycle for a single attempt.

use crate::error::TransferError;
use crate::types::{Status, Task};

use super::context::{AttemptPlan, DownloadTaskContext, StopReason, plan_attempt};
use super::finalization::{finalize_completed, handle_failure, handle_stop};
use super::request::{self, Opened};
use super::streaming::{StreamEnd, stream_to_partial};

/// How an attempt that did not fail came to an end
#[derive(Debug)]
pub(super) enum AttemptOutcome {
    /// Every byte is in the partial file; `total` is the final size
    Finished { total: u64 },
    /// Interrupted by a control operation or shutdown
    Stopped(StopReason),
}

/// Drive one claimed task through a single transfer attempt.
///
/// Phases:
/// 1. Resolve filename, partial path and resume offset
/// 2. Record the partial path on the task
/// 3. Open the (ranged) request and stream the body
/// 4. Finalize, record the stop, or record the failure and schedule a retry
///
/// The task is DOWNLOADING on entry; the worker has already claimed it.
pub(crate) async fn run_download_task(ctx: DownloadTaskContext) {
    let Some(task) = ctx.manager.registry.get(&ctx.id).await else {
        tracing::debug!(task_id = %ctx.id, "Task vanished before the attempt started");
        return;
    };

    let plan = match plan_attempt(ctx.config(), &task).await {
        Ok(plan) => plan,
        Err(e) => {
            handle_failure(&ctx, e, None).await;
            return;
        }
    };

    let recorded = ctx
        .manager
        .registry
        .transition(
            &ctx.id,
            |t| t.status == Status::Downloading,
            |t| {
                t.filename = Some(plan.filename.clone());
                t.temp_path = Some(plan.temp_path.clone());
            },
        )
        .await;
    if let Err(e) = recorded {
        handle_stop(&ctx, e.into(), Some(&plan.temp_path)).await;
        return;
    }

    tracing::debug!(
        task_id = %ctx.id,
        url = %task.url,
        offset = plan.offset,
        path = %plan.temp_path.display(),
        "Starting transfer attempt"
    );

    match execute_attempt(&ctx, &task, &plan).await {
        Ok(AttemptOutcome::Finished { total }) => finalize_completed(&ctx, &task, &plan, total).await,
        Ok(AttemptOutcome::Stopped(reason)) => {
            handle_stop(&ctx, reason, Some(&plan.temp_path)).await
        }
        Err(e) => handle_failure(&ctx, e, Some(&plan.temp_path)).await,
    }
}

/// Request, stream, and check that the body was complete
async fn execute_attempt(
    ctx: &DownloadTaskContext,
    task: &Task,
    plan: &AttemptPlan,
) -> Result<AttemptOutcome, TransferError> {
    let shutdown = ctx.manager.runtime.shutdown.clone();
    let opened = tokio::select! {
        opened = request::open(&ctx.manager.http, task, plan.offset) => opened?,
        _ = shutdown.cancelled() => return Ok(AttemptOutcome::Stopped(StopReason::Shutdown)),
    };

    let (response, offset, total) = match opened {
        Opened::AlreadyComplete { total } => {
            tracing::debug!(task_id = %ctx.id, total, "Partial file already holds the whole resource");
            return Ok(AttemptOutcome::Finished { total });
        }
        Opened::Body {
            response,
            offset,
            total,
        } => (response, offset, total),
    };

    let sized = ctx
        .manager
        .registry
        .transition(
            &ctx.id,
            |t| t.status == Status::Downloading,
            |t| {
                t.total_size = total;
                t.set_downloaded(offset);
            },
        )
        .await;
    if let Err(e) = sized {
        return Ok(AttemptOutcome::Stopped(e.into()));
    }
    ctx.manager.notify(&ctx.id).await;

    match stream_to_partial(ctx, response, &plan.temp_path, offset).await? {
        StreamEnd::Stopped(reason) => Ok(AttemptOutcome::Stopped(reason)),
        StreamEnd::Finished { downloaded } if total > 0 && downloaded < total => {
            Err(TransferError::PrematureEof {
                expected: total,
                received: downloaded,
            })
        }
        StreamEnd::Finished { downloaded } => Ok(AttemptOutcome::Finished {
            total: total.max(downloaded),
        }),
    }
}
