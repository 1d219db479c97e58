//! Router-level tests.
//!
//! These exercise routing, extractors, and error mapping without touching
//! Redis or the object store; handlers that need live backends are left to
//! the ignored integration tests in their own crates.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use vtrans_api::{create_router, ApiConfig, AppState};

/// Build app state against throwaway directories and dummy credentials.
/// Nothing connects until a handler actually talks to a backend.
async fn test_state() -> AppState {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    std::env::set_var("S3_ACCESS_KEY_ID", "test-key");
    std::env::set_var("S3_SECRET_ACCESS_KEY", "test-secret");
    std::env::set_var("S3_BUCKET_NAME", "test-bucket");
    std::env::set_var("VTRANS_WORK_DIR", dir.path().join("work"));
    std::env::set_var("UPLOAD_DIR", dir.path().join("uploads"));
    // Leak the tempdir so the directories outlive the state
    std::mem::forget(dir);

    let mut config = ApiConfig::from_env();
    config.environment = "test".to_string();

    AppState::new(config).await.expect("Failed to create state")
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(test_state().await, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health-check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cancel_requires_job_id() {
    let app = create_router(test_state().await, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cancel-transcoding")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_unknown_job_is_ok() {
    let app = create_router(test_state().await, None);

    // Unknown job: the registry answers without touching Redis.
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cancel-transcoding")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"transcodingJobId":"1700000000000-ab12"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router(test_state().await, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_file_is_404() {
    let app = create_router(test_state().await, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/1700000000000-ab12.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
