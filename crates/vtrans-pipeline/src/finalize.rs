//! Upload finalization.
//!
//! Runs once per job after a successful encode (and for the manual
//! `/upload/s3` path). The ordering is load-bearing: upload, then persist
//! the metadata record, then delete the local artifact. The local file is
//! only removed after the record write succeeds, so a crash in between
//! leaves a recoverable state rather than a lost artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use vtrans_models::ArtifactMetadata;
use vtrans_storage::{ArtifactCatalog, ArtifactStore};

use crate::error::{PipelineError, PipelineResult};

/// Uploads finished artifacts with retry and persists their metadata.
pub struct UploadFinalizer {
    store: Arc<dyn ArtifactStore>,
    catalog: Arc<dyn ArtifactCatalog>,
    work_dir: PathBuf,
    attempts: u32,
    url_ttl: Duration,
}

impl UploadFinalizer {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        catalog: Arc<dyn ArtifactCatalog>,
        work_dir: impl Into<PathBuf>,
        attempts: u32,
        url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            work_dir: work_dir.into(),
            attempts: attempts.max(1),
            url_ttl,
        }
    }

    /// Upload `{work_dir}/{filename}` for `user_id` and persist its record.
    ///
    /// Retries the upload up to the configured attempt count, generating a
    /// fresh signed upload URL per attempt. On success the local artifact no
    /// longer exists and exactly one metadata record does.
    pub async fn finalize(&self, user_id: &str, filename: &str) -> PipelineResult<ArtifactMetadata> {
        let path = self.work_dir.join(filename);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(PipelineError::ArtifactMissing(path.display().to_string()));
        }

        self.upload_with_retry(user_id, filename, &path).await?;

        let download_url = self
            .store
            .presign_download(user_id, filename, self.url_ttl)
            .await?;
        let meta = ArtifactMetadata::new(user_id, filename, download_url);
        self.catalog.create_artifact_record(&meta).await?;

        // Only now is the local copy redundant.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(filename, "Failed to remove local artifact: {}", e);
        } else {
            info!(filename, "Local artifact removed after upload");
        }

        Ok(meta)
    }

    async fn upload_with_retry(&self, user_id: &str, filename: &str, path: &Path) -> PipelineResult<()> {
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            let result = async {
                let url = self.store.presign_upload(user_id, filename, self.url_ttl).await?;
                self.store.put_file(&url, path).await
            }
            .await;

            match result {
                Ok(()) => {
                    info!(filename, attempt, "Upload succeeded");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        filename,
                        attempt,
                        remaining = self.attempts - attempt,
                        "Upload attempt failed: {}",
                        e
                    );
                    metrics::counter!("vtrans_upload_attempt_failures_total").increment(1);
                    last_error = e.to_string();
                }
            }
        }

        Err(PipelineError::UploadRetriesExhausted {
            attempts: self.attempts,
            last_error,
        })
    }
}
