//! # remote-dl
//!
//! Resumable HTTP download manager with a JSON REST API.
//!
//! ## Design Philosophy
//!
//! remote-dl is designed to be:
//! - **Resumable** - Interrupted transfers continue from their partial files
//! - **Bounded** - A fixed worker pool caps simultaneous transfers
//! - **Crash-tolerant** - Periodic snapshots let a restart pick up where it left off
//! - **Observable** - Subscribers receive throttled progress updates, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use remote_dl::{Config, DownloadManager, DownloadRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DownloadManager::new(Config::default()).await?;
//!     manager.start().await;
//!
//!     // Subscribe to progress updates
//!     let mut updates = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(update) = updates.recv().await {
//!             println!("{} {} {:.2}%", update.task_id, update.status, update.progress);
//!         }
//!     });
//!
//!     let id = manager
//!         .submit(DownloadRequest {
//!             url: "https://example.com/ubuntu.iso".into(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("queued {id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Extension-based file categorization
pub mod categorize;
/// Configuration types
pub mod config;
/// FIFO dispatch queue feeding the worker pool
pub mod dispatch;
/// Core download manager (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Log output setup
pub mod logging;
/// Subscriber fan-out with per-task throttling
pub mod notifier;
/// Snapshot persistence
pub mod persistence;
/// Task registry and status transitions
pub mod registry;
/// Retry classification and linear backoff
pub mod retry;
/// Transfer speed measurement
pub mod speed;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use downloader::DownloadManager;
pub use error::{
    ApiError, DownloadError, Error, ErrorDetail, PersistenceError, Result, ToHttpStatus,
    TransferError,
};
pub use notifier::Subscription;
pub use persistence::{JsonSnapshotStore, SnapshotStore};
pub use types::{
    DownloadRequest, DownloadType, FileInfo, Priority, Status, Task, TaskCounts, TaskFilter,
    TaskId, TaskPage, TaskUpdate,
};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use remote_dl::{Config, DownloadManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = DownloadManager::new(Config::default()).await?;
///     manager.start().await;
///
///     // Run with automatic signal handling
///     run_with_shutdown(manager).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: DownloadManager) {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
