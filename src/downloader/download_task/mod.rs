//! Download task execution -- one resumable attempt per worker invocation.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state and the per-attempt plan (paths, resume offset)
//! - [`request`] - Ranged request and response header interpretation
//! - [`streaming`] - Chunk loop writing the partial file
//! - [`orchestration`] - Top-level attempt lifecycle
//! - [`finalization`] - Completion, stop handling, failure and retry scheduling

mod context;
mod finalization;
mod orchestration;
mod request;
mod streaming;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub(crate) use context::DownloadTaskContext;
pub(crate) use orchestration::run_download_task;
