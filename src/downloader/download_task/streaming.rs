//! Chunk loop appending the response body to the partial file.

use std::io::SeekFrom;
use std::path::Path;

use futures::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio::time::Instant;

use crate::error::TransferError;
use crate::speed::SpeedTracker;
use crate::types::Status;

use super::context::{DownloadTaskContext, StopReason};

/// How the body stream ended
#[derive(Debug)]
pub(super) enum StreamEnd {
    /// End of stream reached; `downloaded` counts bytes from position zero
    Finished { downloaded: u64 },
    /// Stopped at a chunk boundary; the partial file is flushed and intact
    Stopped(StopReason),
}

type PartialFile = BufWriter<tokio::fs::File>;

/// Open the partial file positioned at `offset`, truncating when starting over
async fn open_partial(path: &Path, offset: u64, capacity: usize) -> std::io::Result<PartialFile> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(offset == 0)
        .open(path)
        .await?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }
    Ok(BufWriter::with_capacity(capacity, file))
}

async fn close_partial(mut file: PartialFile) -> std::io::Result<()> {
    file.flush().await?;
    file.get_ref().sync_all().await
}

/// Stream `response` into `temp_path` starting at `offset`.
///
/// The task's status is checked before every chunk is written; any status
/// other than DOWNLOADING stops the loop. Progress is written back after
/// each chunk and speed on every [`SpeedTracker`] tick, which also drives a
/// (throttled) notification.
pub(super) async fn stream_to_partial(
    ctx: &DownloadTaskContext,
    response: reqwest::Response,
    temp_path: &Path,
    offset: u64,
) -> Result<StreamEnd, TransferError> {
    let file_err = |source| TransferError::File {
        path: temp_path.to_path_buf(),
        source,
    };
    let registry = &ctx.manager.registry;
    let shutdown = ctx.manager.runtime.shutdown.clone();

    let mut file = open_partial(temp_path, offset, ctx.config().download.chunk_size)
        .await
        .map_err(file_err)?;
    let mut downloaded = offset;
    let mut tracker = SpeedTracker::new(offset, Instant::now());
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = shutdown.cancelled() => {
                close_partial(file).await.map_err(file_err)?;
                return Ok(StreamEnd::Stopped(StopReason::Shutdown));
            }
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                // Keep what arrived so the retry resumes after it
                close_partial(file).await.map_err(file_err)?;
                return Err(TransferError::Network(e));
            }
        };

        let stop = match registry.status(&ctx.id).await {
            Some(Status::Downloading) => None,
            Some(other) => Some(StopReason::Status(other)),
            None => Some(StopReason::Gone),
        };
        if let Some(reason) = stop {
            close_partial(file).await.map_err(file_err)?;
            return Ok(StreamEnd::Stopped(reason));
        }

        file.write_all(&chunk).await.map_err(file_err)?;
        downloaded += chunk.len() as u64;

        let speed = tracker.record(downloaded, Instant::now());
        let tick = registry
            .transition(
                &ctx.id,
                |t| t.status == Status::Downloading,
                |t| {
                    t.set_downloaded(downloaded);
                    speed.map(|s| {
                        t.speed = s;
                        t.clone()
                    })
                },
            )
            .await;
        // A rejected update means a control op got in; the next chunk sees it
        if let Ok(Some(task)) = tick {
            ctx.manager.notifier.publish(&task);
        }
    }

    close_partial(file).await.map_err(file_err)?;
    Ok(StreamEnd::Finished { downloaded })
}
