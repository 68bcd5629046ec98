//! Download task handlers.

use super::{ListQuery, SubmitResponse};
use crate::api::AppState;
use crate::downloader::DEFAULT_LIST_LIMIT;
use crate::error::{ApiError, Result};
use crate::types::{DownloadRequest, FileInfo, Task, TaskId, TaskPage};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /downloads - Submit a download
#[utoipa::path(
    post,
    path = "/api/v1/downloads",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 201, description = "Task queued", body = SubmitResponse),
        (status = 400, description = "Invalid request body or URL", body = ApiError),
        (status = 503, description = "Shutting down", body = ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return ApiError::validation(rejection.body_text()).into_response(),
    };

    match state.manager.submit(request).await {
        Ok(id) => (StatusCode::CREATED, Json(SubmitResponse { id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /downloads - List tasks
#[utoipa::path(
    get,
    path = "/api/v1/downloads",
    tag = "downloads",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of tasks, newest start first", body = TaskPage),
        (status = 400, description = "Invalid filter", body = ApiError)
    )
)]
pub async fn list_downloads(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return ApiError::validation(rejection.body_text()).into_response(),
    };

    let page = state
        .manager
        .list(
            &query.filter(),
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await;
    Json(page).into_response()
}

/// GET /downloads/:id - Get single task
#[utoipa::path(
    get,
    path = "/api/v1/downloads/{id}",
    tag = "downloads",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task record", body = Task),
        (status = 404, description = "Task not found", body = ApiError)
    )
)]
pub async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<Task>> {
    Ok(Json(state.manager.get(&id).await?))
}

/// GET /downloads/:id/files - File backing a task
#[utoipa::path(
    get,
    path = "/api/v1/downloads/{id}/files",
    tag = "downloads",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Final file if completed, partial file otherwise", body = FileInfo),
        (status = 404, description = "Task or file not found", body = ApiError)
    )
)]
pub async fn get_download_files(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<FileInfo>> {
    Ok(Json(state.manager.files(&id).await?))
}

/// POST /downloads/:id/pause - Pause a running transfer
#[utoipa::path(
    post,
    path = "/api/v1/downloads/{id}/pause",
    tag = "downloads",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task paused"),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Task is not downloading", body = ApiError)
    )
)]
pub async fn pause_download(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode> {
    state.manager.pause(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /downloads/:id/resume - Requeue a paused or failed task
#[utoipa::path(
    post,
    path = "/api/v1/downloads/{id}/resume",
    tag = "downloads",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task requeued"),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Task is not paused or failed", body = ApiError)
    )
)]
pub async fn resume_download(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode> {
    state.manager.resume(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /downloads/:id - Cancel an active task or delete a finished one
#[utoipa::path(
    delete,
    path = "/api/v1/downloads/{id}",
    tag = "downloads",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task cancelled or removed"),
        (status = 404, description = "Task not found or already cancelled", body = ApiError)
    )
)]
pub async fn delete_download(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode> {
    state.manager.cancel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
