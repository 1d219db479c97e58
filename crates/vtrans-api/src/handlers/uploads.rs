//! Manual upload handlers.
//!
//! Two-phase path for callers that bring their own files: stage a file into
//! the working directory with `/upload/temp`, then push it to the object
//! store with `/upload/s3`. The second phase reuses the same finalizer as
//! the transcoding completion path (retrying upload, metadata record, local
//! delete).

use axum::extract::multipart::Multipart;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vtrans_storage::ArtifactStore;

use crate::error::{ApiError, ApiResult};
use crate::handlers::transcoding::{sanitize_filename, save_field};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempUploadResponse {
    pub message: String,
    pub file_name: String,
}

/// Stage an uploaded file into the working directory.
pub async fn upload_temp(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TempUploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }

        let file_name = sanitize_filename(field.file_name());
        let path = state.pipeline_config.work_dir.join(&file_name);
        save_field(field, &path).await?;

        return Ok(Json(TempUploadResponse {
            message: "File staged".to_string(),
            file_name,
        }));
    }

    Err(ApiError::bad_request("Missing file field"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3UploadRequest {
    pub user_id: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3UploadResponse {
    pub message: String,
    pub file_name: String,
    pub s3_url: String,
}

/// Push a staged file to the object store.
///
/// Runs the full finalizer: upload with retry, metadata record, then local
/// delete. Returns the signed download URL from the persisted record.
pub async fn upload_s3(
    State(state): State<AppState>,
    Json(request): Json<S3UploadRequest>,
) -> ApiResult<Json<S3UploadResponse>> {
    let user_id = request
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing userId"))?;
    let file_name = request
        .file_name
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing fileName"))?;
    let file_name = sanitize_filename(Some(&file_name));

    let meta = state.finalizer.finalize(&user_id, &file_name).await?;

    Ok(Json(S3UploadResponse {
        message: "Upload complete".to_string(),
        file_name: meta.filename,
        s3_url: meta.s3_url,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    pub presigned_url: String,
}

/// Generate a signed upload URL for a client-direct PUT.
pub async fn presigned_url(
    State(state): State<AppState>,
    Path((user_id, file_name)): Path<(String, String)>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let url = state
        .storage
        .presign_upload(&user_id, &file_name, state.pipeline_config.signed_url_ttl)
        .await?;

    Ok(Json(PresignedUrlResponse { presigned_url: url }))
}
