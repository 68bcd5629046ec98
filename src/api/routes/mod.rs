//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Task submission, lookup and control
//! - [`categories`] - File category table
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::{DownloadType, Status, TaskFilter, TaskId};

mod categories;
mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use categories::*;
pub use downloads::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /downloads
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Only tasks in this status
    pub status: Option<Status>,
    /// Only tasks of this transfer type
    pub download_type: Option<DownloadType>,
    /// Only tasks in this category
    pub category: Option<String>,
    /// Maximum number of items to return (default: 100)
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0)
    pub offset: Option<usize>,
}

impl ListQuery {
    /// The filter part of the query
    pub fn filter(&self) -> TaskFilter {
        TaskFilter {
            status: self.status,
            download_type: self.download_type,
            category: self.category.clone(),
        }
    }
}

/// Response body for POST /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    /// Id of the new task
    pub id: TaskId,
}
