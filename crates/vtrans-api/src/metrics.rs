//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vtrans_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vtrans_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vtrans_http_requests_in_flight";

    // Job metrics (incremented by the pipeline crate)
    pub const JOBS_SUBMITTED_TOTAL: &str = "vtrans_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vtrans_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vtrans_jobs_failed_total";
    pub const JOBS_CANCELED_TOTAL: &str = "vtrans_jobs_canceled_total";
    pub const UPLOAD_ATTEMPT_FAILURES_TOTAL: &str = "vtrans_upload_attempt_failures_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

// Job ids are epoch-millis plus a hex suffix
static JOB_ID_RE: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"[0-9]{10,}-[0-9a-f]{4}").unwrap());
// User/file segments on the signed URL routes
static SIGNED_URL_RE: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"^/(refresh-url|presigned-url)/[^/]+/[^/]+$").unwrap());
// Top-level file delete
static FILE_NAME_RE: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"^/[^/]+\.(mp4|webm)$").unwrap());

/// Sanitize path for metrics labels (collapse ids and file names).
fn sanitize_path(path: &str) -> String {
    let path = JOB_ID_RE.replace_all(path, ":job_id");
    let path = SIGNED_URL_RE.replace_all(&path, "/$1/:user/:file");
    let path = FILE_NAME_RE.replace_all(&path, "/:file_name");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/refresh-url/user-1/1700000000000-ab12.mp4"),
            "/refresh-url/:user/:file"
        );
        assert_eq!(
            sanitize_path("/1700000000000-ab12.mp4"),
            "/:file_name"
        );
        assert_eq!(sanitize_path("/transcoding"), "/transcoding");
    }
}
