//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum concurrently running transcodes
    pub max_concurrent_jobs: usize,
    /// Total upload attempts before a job is marked failed
    pub upload_attempts: u32,
    /// Signed URL lifetime for uploads/downloads
    pub signed_url_ttl: Duration,
    /// Directory holding transcode outputs awaiting upload
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            upload_attempts: 3,
            signed_url_ttl: Duration::from_secs(3600),
            work_dir: PathBuf::from("/tmp/vtrans/videos-handling"),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("VTRANS_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            upload_attempts: std::env::var("VTRANS_UPLOAD_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.upload_attempts),
            signed_url_ttl: Duration::from_secs(
                std::env::var("VTRANS_SIGNED_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            work_dir: std::env::var("VTRANS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
        }
    }
}
