//! Progress snapshots for polling and live streaming.
//!
//! A snapshot is the last-known state of one job. It is persisted in the
//! progress store with a bounded TTL (replaced on every write, never
//! appended) and fanned out to live subscribers. A missing snapshot after
//! TTL expiry means "unknown/expired", not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EncodeOptions, JobId, JobStatus};

/// Last-known progress/state for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Job identifier
    pub job_id: JobId,
    /// Owning user
    pub user_id: String,
    /// Progress percentage (0-100, non-decreasing while running)
    pub percent: u8,
    /// Current job status
    pub status: JobStatus,
    /// Target resolution, echoed for observability
    pub resolution: String,
    /// Target codec, echoed for observability
    pub codec: String,
    /// Error message, present only when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When this snapshot was written
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Create the initial running snapshot for a job.
    pub fn running(job_id: JobId, user_id: impl Into<String>, options: &EncodeOptions) -> Self {
        Self {
            job_id,
            user_id: user_id.into(),
            percent: 0,
            status: JobStatus::Running,
            resolution: options.resolution.clone(),
            codec: options.codec.to_string(),
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Derive a snapshot with updated progress, clamped into 0-100 and never
    /// below the current percent.
    pub fn with_percent(&self, percent: u8) -> Self {
        Self {
            percent: percent.min(100).max(self.percent),
            error: None,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Derive the terminal completed snapshot (percent forced to 100).
    pub fn completed(&self) -> Self {
        Self {
            percent: 100,
            status: JobStatus::Completed,
            error: None,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Derive the terminal failed snapshot.
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(error.into()),
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Derive the terminal canceled snapshot.
    pub fn canceled(&self) -> Self {
        Self {
            status: JobStatus::Canceled,
            error: None,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProgressSnapshot {
        let options = EncodeOptions::parse("1280x720-libx264").unwrap();
        ProgressSnapshot::running(JobId::from_string("j1"), "user-1", &options)
    }

    #[test]
    fn test_initial_snapshot() {
        let snap = snapshot();
        assert_eq!(snap.percent, 0);
        assert_eq!(snap.status, JobStatus::Running);
        assert_eq!(snap.codec, "libx264");
        assert!(!snap.is_terminal());
    }

    #[test]
    fn test_percent_monotone_and_clamped() {
        let snap = snapshot().with_percent(50);
        assert_eq!(snap.percent, 50);

        // A lower reading never moves percent backwards.
        assert_eq!(snap.with_percent(30).percent, 50);
        assert_eq!(snap.with_percent(200).percent, 100);
    }

    #[test]
    fn test_terminal_snapshots() {
        let snap = snapshot().with_percent(80);

        let done = snap.completed();
        assert_eq!(done.percent, 100);
        assert!(done.is_terminal());
        assert!(done.error.is_none());

        let failed = snap.failed("codec exploded");
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("codec exploded"));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(json.contains("\"jobId\":\"j1\""));
        assert!(json.contains("\"status\":\"running\""));
        // No error field on non-failed snapshots.
        assert!(!json.contains("\"error\""));
    }
}
