//! Core types for remote-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a download task
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Allocate a fresh random task id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Download task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting for a worker
    Queued,
    /// A worker is streaming the body
    Downloading,
    /// Finished and moved into place
    Completed,
    /// Attempt failed; terminal once the retry budget is spent
    Failed,
    /// Paused by the user, partial file kept
    Paused,
    /// Cancelled by the user
    Cancelled,
}

impl Status {
    /// Lowercase name used in the wire format and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Downloading => "downloading",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Paused => "paused",
            Status::Cancelled => "cancelled",
        }
    }

    /// Whether a notification carrying this status must never be throttled.
    ///
    /// `Failed` counts here even while a retry is pending, so every failed
    /// attempt is visible to subscribers.
    pub fn is_final(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Cancelled)
    }

    /// Statuses that only ever live in the active partition
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Status::Queued | Status::Downloading)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download priority (stored and reported, never used to reorder the queue)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    Low,
    /// Normal priority
    #[default]
    Normal,
    /// High priority
    High,
}

/// Transfer protocol of a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    /// Plain HTTP(S) with optional Range resume
    #[default]
    Http,
}

/// A client's request to download one file
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Source URL (http or https)
    pub url: String,

    /// Target filename override
    #[serde(default)]
    pub filename: Option<String>,

    /// Advisory priority
    #[serde(default)]
    pub priority: Priority,

    /// `Referer` header sent with every attempt
    #[serde(default)]
    pub referer: Option<String>,

    /// `User-Agent` header override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Byte offset to start from when no larger partial file exists
    #[serde(default)]
    pub start_from: Option<u64>,

    /// Category hint; takes precedence over extension lookup
    #[serde(default)]
    pub category: Option<String>,
}

/// One download task: request attributes plus its mutable lifecycle state.
///
/// This is the full persisted record; restoring it reconstructs progress,
/// destination and retry count exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Source URL
    pub url: String,
    /// Transfer protocol
    #[serde(default)]
    pub download_type: DownloadType,
    /// Requested filename, if any
    #[serde(default)]
    pub filename: Option<String>,
    /// Advisory priority
    #[serde(default)]
    pub priority: Priority,
    /// `Referer` header override
    #[serde(default)]
    pub referer: Option<String>,
    /// `User-Agent` header override
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Requested starting offset
    #[serde(default)]
    pub start_from: Option<u64>,
    /// Category hint from the request, replaced by the resolved category on completion
    #[serde(default)]
    pub category: Option<String>,

    /// Current lifecycle status
    pub status: Status,
    /// Total size in bytes (0 until known)
    #[serde(default)]
    pub total_size: u64,
    /// Bytes present in the partial or final file
    #[serde(default)]
    pub downloaded_size: u64,
    /// Percent complete, 0-100 with two decimals
    #[serde(default)]
    pub progress: f64,
    /// Smoothed transfer speed in bytes per second
    #[serde(default)]
    pub speed: f64,
    /// Failed attempts so far
    #[serde(default)]
    pub retry_count: u32,
    /// Last error message
    #[serde(default)]
    pub error: Option<String>,
    /// Final on-disk path once completed
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub file_path: Option<PathBuf>,
    /// Partial file path while in flight
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub temp_path: Option<PathBuf>,
    /// When the first attempt started
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// When the task reached a final status
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Task {
    /// Build a fresh QUEUED task from a request
    pub fn from_request(id: TaskId, request: DownloadRequest) -> Self {
        Self {
            id,
            url: request.url,
            download_type: DownloadType::Http,
            filename: request.filename,
            priority: request.priority,
            referer: request.referer,
            user_agent: request.user_agent,
            start_from: request.start_from,
            category: request.category,
            status: Status::Queued,
            total_size: 0,
            downloaded_size: 0,
            progress: 0.0,
            speed: 0.0,
            retry_count: 0,
            error: None,
            file_path: None,
            temp_path: None,
            start_time: None,
            end_time: None,
            duration: None,
        }
    }

    /// Record downloaded bytes and recompute progress.
    ///
    /// Progress stays at its last value while the total size is unknown.
    pub fn set_downloaded(&mut self, downloaded: u64) {
        self.downloaded_size = if self.total_size > 0 {
            downloaded.min(self.total_size)
        } else {
            downloaded
        };
        if self.total_size > 0 {
            let pct = self.downloaded_size as f64 / self.total_size as f64 * 100.0;
            self.progress = (pct.clamp(0.0, 100.0) * 100.0).round() / 100.0;
        }
    }

    /// Stamp the end time and compute the duration from the start time
    pub fn mark_ended(&mut self) {
        let now = Utc::now();
        self.end_time = Some(now);
        self.duration = self
            .start_time
            .map(|start| (now - start).num_milliseconds() as f64 / 1000.0);
    }
}

/// Minimal state delta pushed to subscribers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    /// Task identifier
    pub task_id: TaskId,
    /// Current status
    pub status: Status,
    /// Percent complete
    pub progress: f64,
    /// Bytes per second
    pub speed: f64,
    /// Bytes downloaded
    pub downloaded_size: u64,
    /// Total size, 0 if unknown
    pub total_size: u64,
    /// Start timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Last error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Task> for TaskUpdate {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.status,
            progress: task.progress,
            speed: task.speed,
            downloaded_size: task.downloaded_size,
            total_size: task.total_size,
            start_time: task.start_time,
            end_time: task.end_time,
            error: task.error.clone(),
        }
    }
}

/// Listing filters; every set field must match
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskFilter {
    /// Match this status
    #[serde(default)]
    pub status: Option<Status>,
    /// Match this transfer type
    #[serde(default)]
    pub download_type: Option<DownloadType>,
    /// Match this category
    #[serde(default)]
    pub category: Option<String>,
}

impl TaskFilter {
    /// Whether `task` passes every set filter
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.download_type.is_none_or(|t| task.download_type == t)
            && self
                .category
                .as_deref()
                .is_none_or(|c| task.category.as_deref() == Some(c))
    }
}

/// One page of a listing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskPage {
    /// Tasks on this page
    pub items: Vec<Task>,
    /// Matching tasks before pagination
    pub total: usize,
}

/// Descriptor of the file backing a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    /// File name
    pub name: String,
    /// Absolute or configured-relative path
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Size on disk in bytes
    pub size: u64,
    /// Always false; a task backs exactly one file
    pub is_dir: bool,
}

/// Task counts for health reporting
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskCounts {
    /// Tasks in the active partition
    pub active: usize,
    /// Active tasks waiting in the queue
    pub queued: usize,
    /// Active tasks being transferred
    pub downloading: usize,
    /// Tasks retained in history
    pub history: usize,
}
