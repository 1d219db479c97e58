//! Job identity and lifecycle status.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unique identifier for a transcoding job.
///
/// Ids are time-based (epoch milliseconds) with a short random suffix, so
/// they sort roughly by submission time and collisions are practically
/// impossible. The registry still rejects duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new job ID.
    pub fn new() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u16 = rand::rng().random();
        Self(format!("{}-{:04x}", millis, suffix))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transcoding job status.
///
/// Transitions are monotone: once a job reaches a terminal state it never
/// leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is actively transcoding
    #[default]
    Running,
    /// Job finished and the artifact was uploaded
    Completed,
    /// Job failed (encode or upload error)
    Failed,
    /// Job was canceled by the caller
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
