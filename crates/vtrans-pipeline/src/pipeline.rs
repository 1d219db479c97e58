//! Submission and the per-job event pump.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use vtrans_engine::{EngineEvent, JobRegistry, TakenJob, TranscodingEngine};
use vtrans_models::{EncodeOptions, JobId, ProgressSnapshot};
use vtrans_progress::ProgressChannel;

use crate::config::PipelineConfig;
use crate::finalize::UploadFinalizer;

/// Coordinates transcoding jobs end to end.
///
/// Submission hands off to a background task and returns the job id
/// immediately; the task acquires a concurrency permit, starts the engine,
/// registers its handle, and pumps engine events into the progress channel
/// until a terminal event. All terminal outcomes (including cancellation,
/// which runs elsewhere) are serialized through `JobRegistry::take`:
/// whoever gets the handle records the outcome, everyone else stands down.
pub struct TranscodePipeline {
    registry: Arc<JobRegistry>,
    channel: ProgressChannel,
    finalizer: Arc<UploadFinalizer>,
    permits: Arc<Semaphore>,
    work_dir: PathBuf,
}

impl TranscodePipeline {
    pub fn new(
        config: &PipelineConfig,
        registry: Arc<JobRegistry>,
        channel: ProgressChannel,
        finalizer: Arc<UploadFinalizer>,
    ) -> Self {
        Self {
            registry,
            channel,
            finalizer,
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            work_dir: config.work_dir.clone(),
        }
    }

    /// Submit a job. Returns the new job id before the encode does any
    /// work; progress is observable via the channel/store from then on.
    ///
    /// The job is reserved in the registry before this returns, so a
    /// cancel arriving while the job is still queued (or while the engine
    /// is starting) finds an entry to take.
    pub async fn submit(
        self: &Arc<Self>,
        input: PathBuf,
        user_id: impl Into<String>,
        options: EncodeOptions,
    ) -> JobId {
        let job_id = loop {
            let candidate = JobId::new();
            if self.registry.reserve(&candidate).await.is_ok() {
                break candidate;
            }
        };
        let user_id = user_id.into();

        info!(job_id = %job_id, user_id = %user_id, option = %options, "Job submitted");
        metrics::counter!("vtrans_jobs_submitted_total").increment(1);

        let pipeline = Arc::clone(self);
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            pipeline.run_job(task_job_id, input, user_id, options).await;
        });

        job_id
    }

    async fn run_job(&self, job_id: JobId, input: PathBuf, user_id: String, options: EncodeOptions) {
        // Bounded worker pool: at most `max_concurrent_jobs` engines run at
        // once; queued jobs wait here, not in the HTTP handler.
        let Ok(_permit) = Arc::clone(&self.permits).acquire_owned().await else {
            let _ = self.registry.take(&job_id).await;
            return;
        };

        // Canceled while queued: the reservation is already gone.
        if !self.registry.contains(&job_id).await {
            info!(job_id = %job_id, "Job canceled before start");
            return;
        }

        let filename = options.output_filename(&job_id);
        let output = self.work_dir.join(&filename);
        let snapshot = ProgressSnapshot::running(job_id.clone(), &user_id, &options);
        self.publish(&snapshot).await;

        let (handle, mut events) =
            match TranscodingEngine::start(&input, &output, &options, &job_id).await {
                Ok(started) => started,
                Err(e) => {
                    error!(job_id = %job_id, "Engine failed to start: {}", e);
                    self.publish(&snapshot.failed(e.to_string())).await;
                    metrics::counter!("vtrans_jobs_failed_total").increment(1);
                    let _ = self.registry.take(&job_id).await;
                    return;
                }
            };

        if let Err(mut orphan) = self.registry.promote(handle).await {
            // Cancel took the reservation while the engine was starting;
            // this task still owns the engine and must tear it down.
            info!(job_id = %job_id, "Job canceled during startup, stopping engine");
            orphan.cancel().await;
            if let Err(e) = self.channel.store().delete(&job_id).await {
                warn!(job_id = %job_id, "Failed to delete snapshot: {}", e);
            }
            self.remove_output(&job_id, &output).await;
            return;
        }

        let mut last = snapshot;
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Progress { percent } => {
                    last = last.with_percent(percent);
                    self.publish(&last).await;
                }
                EngineEvent::Completed => {
                    self.handle_completed(&job_id, &user_id, &filename, &last).await;
                    break;
                }
                EngineEvent::Failed { error } => {
                    self.handle_failed(&job_id, &last, &error).await;
                    break;
                }
                EngineEvent::Canceled => {
                    // Progress events buffered before the kill may have
                    // re-written the snapshot after the cancel path deleted
                    // it. `Canceled` is the final event, so this delete is
                    // the last write for the job.
                    if let Err(e) = self.channel.store().delete(&job_id).await {
                        warn!(job_id = %job_id, "Failed to delete snapshot: {}", e);
                    }
                    info!(job_id = %job_id, "Engine canceled");
                    break;
                }
            }
        }

        // A dead engine's handle must never stay registered.
        let _ = self.registry.take(&job_id).await;
    }

    async fn handle_completed(&self, job_id: &JobId, user_id: &str, filename: &str, last: &ProgressSnapshot) {
        // First writer wins: a concurrent cancel that already took the
        // handle owns the outcome, and this completion must not resurrect
        // the entry or overwrite its cleanup.
        let Some(TakenJob::Running(_)) = self.registry.take(job_id).await else {
            info!(job_id = %job_id, "Completion lost the race to cancel, standing down");
            return;
        };

        match self.finalizer.finalize(user_id, filename).await {
            Ok(meta) => {
                info!(job_id = %job_id, s3_url = %meta.s3_url, "Job finalized");
                self.publish(&last.completed()).await;
                metrics::counter!("vtrans_jobs_completed_total").increment(1);
            }
            Err(e) => {
                error!(job_id = %job_id, "Finalization failed: {}", e);
                self.publish(&last.failed(e.to_string())).await;
                metrics::counter!("vtrans_jobs_failed_total").increment(1);
            }
        }
    }

    async fn handle_failed(&self, job_id: &JobId, last: &ProgressSnapshot, error: &str) {
        let Some(TakenJob::Running(_)) = self.registry.take(job_id).await else {
            return;
        };

        error!(job_id = %job_id, "Transcoding failed: {}", error);
        self.publish(&last.failed(error)).await;
        metrics::counter!("vtrans_jobs_failed_total").increment(1);
    }

    async fn remove_output(&self, job_id: &JobId, output: &std::path::Path) {
        match tokio::fs::remove_file(output).await {
            Ok(()) => info!(job_id = %job_id, "Removed partial output {}", output.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %job_id, "Failed to remove {}: {}", output.display(), e),
        }
    }

    /// The engine outcome is authoritative; a progress-store outage must
    /// not fail the job, so publish errors are logged and swallowed.
    async fn publish(&self, snapshot: &ProgressSnapshot) {
        if let Err(e) = self.channel.publish(snapshot).await {
            warn!(job_id = %snapshot.job_id, "Failed to publish snapshot: {}", e);
        }
    }
}
