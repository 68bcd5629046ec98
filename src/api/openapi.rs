//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the remote-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the remote-dl REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "remote-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting, controlling and monitoring resumable HTTP downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000/api/v1", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit_download,
        crate::api::routes::list_downloads,
        crate::api::routes::get_download,
        crate::api::routes::get_download_files,
        crate::api::routes::pause_download,
        crate::api::routes::resume_download,
        crate::api::routes::delete_download,

        // System
        crate::api::routes::list_categories,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::Status,
        crate::types::Priority,
        crate::types::DownloadType,
        crate::types::DownloadRequest,
        crate::types::Task,
        crate::types::TaskUpdate,
        crate::types::TaskPage,
        crate::types::FileInfo,
        crate::types::TaskCounts,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::RetryConfig,
        crate::config::PersistenceConfig,
        crate::config::NotificationConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,
        crate::config::LogConfig,

        // API request/response types from routes
        crate::api::routes::ListQuery,
        crate::api::routes::SubmitResponse,
        crate::api::routes::HealthResponse,
        crate::api::routes::CategoryInfo,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Download tasks - Submit, list, pause, resume and cancel"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
