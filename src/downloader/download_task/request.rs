//! Ranged request and response header interpretation.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, RANGE, REFERER, USER_AGENT};

use crate::error::TransferError;
use crate::types::Task;

/// What the server offered for this attempt
pub(super) enum Opened {
    /// A body to stream, starting at `offset`
    Body {
        response: reqwest::Response,
        offset: u64,
        /// Total size of the resource, 0 if unknown
        total: u64,
    },
    /// The partial file already holds the whole resource
    AlreadyComplete { total: u64 },
}

/// Issue the GET for `task`, asking for `offset..` when resuming.
///
/// 200 and 206 are accepted. A 200 answer to a ranged request means the
/// server ignored the range, so the attempt restarts at zero.
pub(super) async fn open(
    client: &reqwest::Client,
    task: &Task,
    offset: u64,
) -> Result<Opened, TransferError> {
    let mut request = client.get(&task.url);
    if offset > 0 {
        request = request.header(RANGE, format!("bytes={}-", offset));
    }
    if let Some(referer) = &task.referer {
        request = request.header(REFERER, referer);
    }
    if let Some(agent) = &task.user_agent {
        request = request.header(USER_AGENT, agent);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_builder() {
            TransferError::InvalidRequest(e.to_string())
        } else {
            TransferError::Network(e)
        }
    })?;
    let status = response.status();
    let content_range = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match status {
        StatusCode::PARTIAL_CONTENT => {
            let total = content_range
                .as_deref()
                .and_then(content_range_total)
                .or_else(|| response.content_length().map(|len| offset + len))
                .unwrap_or(0);
            Ok(Opened::Body {
                response,
                offset,
                total,
            })
        }
        StatusCode::OK => {
            if offset > 0 {
                tracing::debug!(task_id = %task.id, offset, "Server ignored Range header, restarting from zero");
            }
            let total = response.content_length().unwrap_or(0);
            Ok(Opened::Body {
                response,
                offset: 0,
                total,
            })
        }
        StatusCode::RANGE_NOT_SATISFIABLE
            if offset > 0
                && content_range.as_deref().and_then(content_range_total) == Some(offset) =>
        {
            Ok(Opened::AlreadyComplete { total: offset })
        }
        other => Err(TransferError::Http {
            status: other.as_u16(),
        }),
    }
}

/// Total length from a `Content-Range` value such as `bytes 0-99/1000` or `bytes */1000`
pub(super) fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
