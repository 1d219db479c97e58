//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::health::{health_check, ready};
use crate::handlers::transcoding::{
    cancel_transcoding, delete_file, progress_stream, refresh_url, submit_transcoding,
};
use crate::handlers::uploads::{presigned_url, upload_s3, upload_temp};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let transcoding_routes = Router::new()
        .route("/transcoding", post(submit_transcoding))
        .route("/cancel-transcoding", delete(cancel_transcoding))
        .route("/progress", get(progress_stream))
        .route("/refresh-url/:user_id/:file_name", get(refresh_url));

    let upload_routes = Router::new()
        .route("/upload/temp", post(upload_temp))
        .route("/upload/s3", post(upload_s3))
        .route("/presigned-url/:user_id/:file_name", get(presigned_url));

    let health_routes = Router::new()
        .route("/health-check", get(health_check))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(transcoding_routes)
        .merge(upload_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Wildcard; the static routes above take precedence in matching
        .route("/:file_name", delete(delete_file))
        // The built-in limit defaults to 2MB, far too small for source videos
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
