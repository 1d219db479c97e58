//! Persisted artifact metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record persisted after a successful upload.
///
/// Created exactly once per successful job and never mutated; the signed
/// download URL is refreshed on demand by re-signing the same object key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    /// Stored filename (`<job_id>.<ext>`)
    pub filename: String,
    /// File extension including the dot (".mp4", ".webm")
    pub extension: String,
    /// Owning user, also the storage namespace
    pub user_id: String,
    /// Time-limited signed download URL
    pub s3_url: String,
    /// Creation timestamp
    pub date_created: DateTime<Utc>,
}

impl ArtifactMetadata {
    /// Build a record for a freshly uploaded artifact.
    pub fn new(user_id: impl Into<String>, filename: impl Into<String>, s3_url: impl Into<String>) -> Self {
        let filename = filename.into();
        let extension = filename
            .rfind('.')
            .map(|i| filename[i..].to_string())
            .unwrap_or_default();
        Self {
            filename,
            extension,
            user_id: user_id.into(),
            s3_url: s3_url.into(),
            date_created: Utc::now(),
        }
    }
}
