//! System handlers: health, OpenAPI, events.

use crate::api::AppState;
use crate::types::TaskCounts;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// SSE event name carrying task updates
pub const DOWNLOADS_EVENT: &str = "downloads";

/// Response body for GET /health
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// "ok" while accepting work, "shutting_down" afterwards
    pub status: String,
    /// Crate version
    pub version: String,
    /// Task counts per partition
    pub tasks: TaskCounts,
    /// Ids waiting in the dispatch queue
    pub queue_depth: usize,
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.manager.is_accepting() {
        "ok"
    } else {
        "shutting_down"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tasks: state.manager.counts().await,
        queue_depth: state.manager.queue_depth(),
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /events - Server-sent events stream
///
/// Each event is named `downloads` and carries one task update as JSON.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let subscription = state.manager.subscribe();
    tracing::debug!(subscriber = subscription.id(), "SSE client connected");
    let stream = UnboundedReceiverStream::new(subscription.into_receiver());

    let sse_stream = stream.filter_map(|update| match serde_json::to_string(&update) {
        Ok(json_data) => Some(Ok(SseEvent::default().event(DOWNLOADS_EVENT).data(json_data))),
        Err(e) => {
            tracing::warn!(task_id = %update.task_id, error = %e, "Failed to serialize task update");
            None
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
