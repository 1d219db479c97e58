//! Axum HTTP API server.
//!
//! This crate provides:
//! - Job submission, cancellation, and live SSE progress
//! - Signed URL refresh and manual upload endpoints
//! - Security headers and CORS
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
