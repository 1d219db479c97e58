//! Mid-flight job cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use vtrans_engine::{JobRegistry, TakenJob};
use vtrans_models::JobId;
use vtrans_progress::ProgressStore;

/// Result of a cancel request. Both variants are success from the caller's
/// point of view; cancel is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A running job was terminated and cleaned up.
    Canceled,
    /// No live job with that id (never existed, already finished, or
    /// already canceled).
    NotFound,
}

/// Terminates running engines and cleans up their traces.
pub struct CancellationManager {
    registry: Arc<JobRegistry>,
    store: ProgressStore,
    work_dir: PathBuf,
}

impl CancellationManager {
    pub fn new(registry: Arc<JobRegistry>, store: ProgressStore, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            store,
            work_dir: work_dir.into(),
        }
    }

    /// Cancel a job: kill the engine, drop the snapshot, remove partial
    /// output. Taking the entry out of the registry is the commit point;
    /// if the terminal event got there first this is a no-op and the
    /// already-persisted outcome is left untouched. Cleanup failures are
    /// logged and do not fail the cancel.
    pub async fn cancel(&self, job_id: &JobId) -> CancelOutcome {
        match self.registry.take(job_id).await {
            None => return CancelOutcome::NotFound,
            Some(TakenJob::Pending) => {
                // The engine never started, so there is no process to
                // kill; the pipeline task observes the missing
                // reservation and stands down.
                info!(job_id = %job_id, "Canceled before engine start");
            }
            Some(TakenJob::Running(mut handle)) => {
                // Returns after the child has been reaped, so the partial
                // output below is no longer being written.
                handle.cancel().await;
            }
        }

        if let Err(e) = self.store.delete(job_id).await {
            warn!(job_id = %job_id, "Failed to delete progress snapshot: {}", e);
        }

        self.remove_partial_output(job_id).await;

        metrics::counter!("vtrans_jobs_canceled_total").increment(1);
        info!(job_id = %job_id, "Job canceled and cleaned up");
        CancelOutcome::Canceled
    }

    /// The output extension depends on the codec, which the manager does
    /// not know; try every container the service produces.
    async fn remove_partial_output(&self, job_id: &JobId) {
        for ext in ["mp4", "webm"] {
            let path = self.work_dir.join(format!("{}.{}", job_id, ext));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(job_id = %job_id, "Removed partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(job_id = %job_id, "Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}
