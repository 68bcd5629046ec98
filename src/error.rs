//! Error types for remote-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Download, Transfer, Persistence, Config)
//!
//! Transfer errors stay inside the worker: they drive retries and end up as a
//! task's `error_message`, never as an [`Error`].
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::TaskId;

/// Result type alias for remote-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for remote-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Task control or lookup error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Snapshot read or write failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Submission rejected before a task was created
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised by control and query operations on a task
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No task with this id exists
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: TaskId,
    },

    /// The operation is not permitted from the task's current status
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidState {
        /// The task ID
        id: TaskId,
        /// The operation that was attempted (e.g., "pause", "resume")
        operation: String,
        /// The current state of the task
        current_state: String,
    },

    /// The task exists but no file backs it on disk
    #[error("no file on disk for task {id}")]
    FileNotFound {
        /// The task ID
        id: TaskId,
    },
}

/// Errors from one transfer attempt
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server answered with something other than 200 or 206
    #[error("unexpected HTTP status {status}")]
    Http {
        /// Status code returned by the server
        status: u16,
    },

    /// Connection, DNS or body read failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The stream ended before the announced total size arrived
    #[error("connection closed after {received} of {expected} bytes")]
    PrematureEof {
        /// Total size announced by the server
        expected: u64,
        /// Bytes present when the stream ended
        received: u64,
    },

    /// Writing or renaming the file failed
    #[error("file error at {path}: {source}")]
    File {
        /// The file being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The request could not be built (bad header value and similar)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from the snapshot store
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading a snapshot failed
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// Snapshot file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Writing a snapshot failed
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        /// Snapshot file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be parsed
    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        /// Snapshot file
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },
}

/// API error response format
///
/// This is the standard JSON error format returned by all API endpoints.
///
/// # Example JSON
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_state",
///     "message": "cannot pause task 1b4e... in state queued",
///     "details": {
///       "task_id": "1b4e...",
///       "operation": "pause",
///       "current_state": "queued"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            // 404 Not Found
            Error::Download(DownloadError::NotFound { .. }) => 404,
            Error::Download(DownloadError::FileNotFound { .. }) => 404,

            // 409 Conflict
            Error::Download(DownloadError::InvalidState { .. }) => 409,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            Error::Persistence(_)
            | Error::Io(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "validation_error",
            Error::Download(DownloadError::NotFound { .. }) => "not_found",
            Error::Download(DownloadError::FileNotFound { .. }) => "file_not_found",
            Error::Download(DownloadError::InvalidState { .. }) => "invalid_state",
            Error::Persistence(_) => "persistence_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Download(DownloadError::NotFound { id })
            | Error::Download(DownloadError::FileNotFound { id }) => {
                Some(serde_json::json!({ "task_id": id }))
            }
            Error::Download(DownloadError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
