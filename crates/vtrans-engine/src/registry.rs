//! Process-wide table of live and pending jobs.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use vtrans_models::JobId;

use crate::engine::EngineHandle;
use crate::error::{EngineError, EngineResult};

/// A job entry removed from the registry by `take`.
pub enum TakenJob {
    /// The job was reserved but its engine had not started yet. There is
    /// no process to kill.
    Pending,
    /// The job's engine was running; the handle is now owned by the caller.
    Running(EngineHandle),
}

enum Slot {
    Pending,
    Running(EngineHandle),
}

/// Registry mapping job id to its lifecycle slot.
///
/// A job is reserved at submission time, before its engine exists, so a
/// cancel arriving while the job is still queued (or mid engine startup)
/// finds something to take. Exactly one entry exists per job id. Entries
/// are removed by `take`, which transfers ownership to the caller; both
/// terminal event handling and cancellation race through `take`, so
/// exactly one of them ever owns the teardown. The lock is held only for
/// the map operation itself, never across I/O.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Slot>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a job id before its engine starts. Reserving a duplicate
    /// job id is an error.
    pub async fn reserve(&self, job_id: &JobId) -> EngineResult<()> {
        let mut jobs = self.jobs.lock().await;

        if jobs.contains_key(job_id) {
            return Err(EngineError::DuplicateJob(job_id.clone()));
        }

        debug!(job_id = %job_id, "Reserved job slot");
        jobs.insert(job_id.clone(), Slot::Pending);
        Ok(())
    }

    /// Swap a reservation for the live engine handle.
    ///
    /// Returns the handle back as `Err` when the reservation is gone,
    /// which means the job was canceled while starting; the caller still
    /// owns the engine and must tear it down.
    pub async fn promote(&self, handle: EngineHandle) -> Result<(), EngineHandle> {
        let job_id = handle.job_id().clone();
        let mut jobs = self.jobs.lock().await;

        match jobs.get(&job_id) {
            Some(Slot::Pending) => {
                debug!(job_id = %job_id, "Promoted reservation to live handle");
                jobs.insert(job_id, Slot::Running(handle));
                Ok(())
            }
            _ => Err(handle),
        }
    }

    /// Whether an entry (reserved or running) exists for this job.
    pub async fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.lock().await.contains_key(job_id)
    }

    /// Remove and return the entry, if present. After this returns `Some`,
    /// no other caller can observe the job.
    pub async fn take(&self, job_id: &JobId) -> Option<TakenJob> {
        let slot = self.jobs.lock().await.remove(job_id);
        match slot {
            Some(Slot::Pending) => {
                debug!(job_id = %job_id, "Took pending reservation out of registry");
                Some(TakenJob::Pending)
            }
            Some(Slot::Running(handle)) => {
                debug!(job_id = %job_id, "Took engine handle out of registry");
                Some(TakenJob::Running(handle))
            }
            None => None,
        }
    }

    /// Number of currently tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
