//! Application state for the API server

use crate::{Config, DownloadManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; the manager is itself a bundle of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The download manager
    pub manager: DownloadManager,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: DownloadManager, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
