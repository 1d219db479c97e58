//! Artifact metadata catalog.
//!
//! Metadata records are written only after a successful upload, and the
//! local artifact is deleted only after the record write succeeds. The
//! default implementation keeps each record as a JSON object next to the
//! artifact itself (`{user}/{filename}.meta.json`), so a crash between
//! upload and record write can be recovered by re-deriving the record from
//! the stored object.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use vtrans_models::ArtifactMetadata;

use crate::client::S3Store;
use crate::error::StorageResult;

/// Metadata store seam, consumed by the upload finalizer.
#[async_trait]
pub trait ArtifactCatalog: Send + Sync {
    /// Persist a metadata record. Called exactly once per successful job.
    async fn create_artifact_record(&self, meta: &ArtifactMetadata) -> StorageResult<()>;

    /// Fetch a previously persisted record, if any.
    async fn get_artifact_record(&self, user: &str, filename: &str) -> StorageResult<Option<ArtifactMetadata>>;
}

/// Catalog backed by the object store itself.
#[derive(Clone)]
pub struct ObjectCatalog {
    store: Arc<S3Store>,
}

impl ObjectCatalog {
    pub fn new(store: Arc<S3Store>) -> Self {
        Self { store }
    }

    fn record_key(user: &str, filename: &str) -> String {
        format!("{}/{}.meta.json", user, filename)
    }
}

#[async_trait]
impl ArtifactCatalog for ObjectCatalog {
    async fn create_artifact_record(&self, meta: &ArtifactMetadata) -> StorageResult<()> {
        let key = Self::record_key(&meta.user_id, &meta.filename);
        let payload = serde_json::to_vec(meta)?;

        self.store.put_bytes(&key, payload, "application/json").await?;
        info!(user = %meta.user_id, filename = %meta.filename, "Persisted artifact record");
        Ok(())
    }

    async fn get_artifact_record(&self, user: &str, filename: &str) -> StorageResult<Option<ArtifactMetadata>> {
        let key = Self::record_key(user, filename);
        match self.store.get_bytes(&key).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(crate::StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_sits_next_to_artifact() {
        assert_eq!(
            ObjectCatalog::record_key("user-1", "job-9.mp4"),
            "user-1/job-9.mp4.meta.json"
        );
    }
}
