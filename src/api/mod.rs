//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting, controlling
//! and monitoring download tasks.

use crate::{Config, DownloadManager, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Prefix every API route is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Create the API router with all route definitions
///
/// # Routes
///
/// All routes below are mounted under `/api/v1`.
///
/// ## Downloads
/// - `POST /downloads` - Submit a download
/// - `GET /downloads` - List tasks (`status`, `download_type`, `category`, `limit`, `offset`)
/// - `GET /downloads/:id` - Get single task
/// - `GET /downloads/:id/files` - File backing a task
/// - `POST /downloads/:id/pause` - Pause a running transfer
/// - `POST /downloads/:id/resume` - Requeue a paused or failed task
/// - `DELETE /downloads/:id` - Cancel, or delete from history
///
/// ## System
/// - `GET /categories` - File categories and the fallback
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream of task updates
///
/// `GET /swagger-ui` serves interactive documentation when enabled.
pub fn create_router(manager: DownloadManager, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let api = Router::new()
        .route(
            "/downloads",
            post(routes::submit_download).get(routes::list_downloads),
        )
        .route(
            "/downloads/:id",
            get(routes::get_download).delete(routes::delete_download),
        )
        .route("/downloads/:id/files", get(routes::get_download_files))
        .route("/downloads/:id/pause", post(routes::pause_download))
        .route("/downloads/:id/resume", post(routes::resume_download))
        .route("/categories", get(routes::list_categories))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    let router = Router::new().nest(API_PREFIX, api);

    // Swagger UI points at the /openapi.json endpoint defined above
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the listener fails or the process exits.
///
/// # Example
///
/// ```no_run
/// use remote_dl::{Config, DownloadManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = DownloadManager::new((*config).clone()).await?;
///
/// // Start API server (blocks until shutdown)
/// remote_dl::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: DownloadManager, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
