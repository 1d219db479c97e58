//! Transcoding job handlers: submit, cancel, live progress, file cleanup.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{future, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use vtrans_models::{EncodeOptions, JobId};
use vtrans_pipeline::CancelOutcome;
use vtrans_storage::ArtifactStore;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a submitted job.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub transcoding_job_id: JobId,
}

/// Submit a transcoding job.
///
/// Multipart form: `video` (the source file), `transcodingOption`
/// (`"<resolution>-<codec>"`), `userId`. Returns the job id immediately;
/// the encode runs in the background and progress is observable via
/// `GET /progress`.
pub async fn submit_transcoding(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut input: Option<PathBuf> = None;
    let mut option_str: Option<String> = None;
    let mut user_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("video") => {
                let filename = sanitize_filename(field.file_name());
                let path = state.config.upload_dir.join(&filename);
                save_field(field, &path).await?;
                input = Some(path);
            }
            Some("transcodingOption") => {
                option_str = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("userId") => {
                user_id = Some(field.text().await.map_err(bad_multipart)?);
            }
            _ => {}
        }
    }

    let input = input.ok_or_else(|| ApiError::bad_request("Missing video file"))?;
    let option_str =
        option_str.ok_or_else(|| ApiError::bad_request("Missing transcodingOption field"))?;
    let user_id = user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing userId field"))?;

    // Validated before anything reaches a process invocation.
    let options = EncodeOptions::parse(&option_str)?;

    let job_id = state.pipeline.submit(input, user_id, options).await;

    Ok(Json(SubmitResponse {
        message: "Transcoding started".to_string(),
        transcoding_job_id: job_id,
    }))
}

/// Cancel request body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub transcoding_job_id: Option<String>,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub message: String,
}

/// Cancel a running job.
///
/// Idempotent: cancelling an unknown or already-finished job returns 200
/// with a "no running job" message rather than an error.
pub async fn cancel_transcoding(
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<CancelResponse>> {
    let job_id = request
        .transcoding_job_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing transcodingJobId"))?;
    let job_id = JobId::from_string(job_id);

    let message = match state.canceller.cancel(&job_id).await {
        CancelOutcome::Canceled => "Transcoding canceled",
        CancelOutcome::NotFound => "No running job with that id",
    };

    Ok(Json(CancelResponse {
        message: message.to_string(),
    }))
}

/// Progress query parameters.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub job_id: String,
}

/// Stream job progress as Server-Sent Events.
///
/// If a snapshot already exists it is emitted as the first event, so late
/// subscribers see the current state without waiting for the next tick.
/// The stream ends after the first terminal snapshot. An unknown or expired
/// job id produces an open stream that emits nothing.
pub async fn progress_stream(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let job_id = JobId::from_string(query.job_id);

    // Subscribe before the initial read so no event can slip between them.
    let live = state.channel.subscribe(&job_id).await?;
    let initial = state.store.get(&job_id).await?;

    let snapshots = futures_util::stream::iter(initial).chain(live);

    let events = snapshots
        .scan(false, |done, snapshot| {
            if *done {
                return future::ready(None);
            }
            *done = snapshot.status.is_terminal();
            future::ready(Some(snapshot))
        })
        .map(|snapshot| Event::default().json_data(&snapshot));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Delete a leftover local artifact and its progress snapshot.
///
/// The file name doubles as the job reference: outputs are named
/// `{job_id}.{ext}`, so the stem is the snapshot key.
pub async fn delete_file(
    State(state): State<AppState>,
    axum::extract::Path(file_name): axum::extract::Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let file_name = sanitize_filename(Some(&file_name));
    let path = state.pipeline_config.work_dir.join(&file_name);

    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!(file_name, "Deleted local artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("No such file: {}", file_name)));
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to delete file: {}", e))),
    }

    if let Some(stem) = Path::new(&file_name).file_stem().and_then(|s| s.to_str()) {
        let job_id = JobId::from_string(stem);
        if let Err(e) = state.store.delete(&job_id).await {
            warn!(job_id = %job_id, "Failed to delete snapshot: {}", e);
        }
    }

    Ok(Json(DeleteResponse {
        message: "Delete done".to_string(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshUrlResponse {
    pub refreshed_url: String,
}

/// Regenerate an expired signed download URL for a stored artifact.
pub async fn refresh_url(
    State(state): State<AppState>,
    axum::extract::Path((user_id, file_name)): axum::extract::Path<(String, String)>,
) -> ApiResult<Json<RefreshUrlResponse>> {
    if !state.storage.exists(&user_id, &file_name).await? {
        return Err(ApiError::not_found(format!("No such object: {}", file_name)));
    }

    let url = state
        .storage
        .presign_download(&user_id, &file_name, state.pipeline_config.signed_url_ttl)
        .await?;

    Ok(Json(RefreshUrlResponse { refreshed_url: url }))
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::bad_request(format!("Invalid multipart request: {}", e))
}

/// Strip any path components from a client-supplied file name.
pub(crate) fn sanitize_filename(name: Option<&str>) -> String {
    name.and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("upload.bin")
        .to_string()
}

/// Stream a multipart field to disk.
pub(crate) async fn save_field(mut field: Field<'_>, path: &Path) -> ApiResult<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create {}: {}", path.display(), e)))?;

    while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to flush upload: {}", e)))?;

    Ok(())
}
