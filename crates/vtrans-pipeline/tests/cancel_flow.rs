//! End-to-end cancellation tests against real Redis and FFmpeg.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use vtrans_engine::JobRegistry;
use vtrans_models::{ArtifactMetadata, EncodeOptions, JobId};
use vtrans_pipeline::{
    CancelOutcome, CancellationManager, PipelineConfig, TranscodePipeline, UploadFinalizer,
};
use vtrans_progress::{ProgressChannel, ProgressStore};
use vtrans_storage::{ArtifactCatalog, ArtifactStore, StorageResult};

struct NullStore;

#[async_trait]
impl ArtifactStore for NullStore {
    async fn presign_upload(&self, user: &str, key: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(format!("https://upload/{}/{}", user, key))
    }

    async fn presign_download(&self, user: &str, key: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(format!("https://download/{}/{}", user, key))
    }

    async fn put_file(&self, _url: &str, _path: &Path) -> StorageResult<()> {
        Ok(())
    }

    async fn delete(&self, _user: &str, _key: &str) -> StorageResult<()> {
        Ok(())
    }
}

struct NullCatalog;

#[async_trait]
impl ArtifactCatalog for NullCatalog {
    async fn create_artifact_record(&self, _meta: &ArtifactMetadata) -> StorageResult<()> {
        Ok(())
    }

    async fn get_artifact_record(
        &self,
        _user: &str,
        _filename: &str,
    ) -> StorageResult<Option<ArtifactMetadata>> {
        Ok(None)
    }
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

struct Harness {
    pipeline: Arc<TranscodePipeline>,
    canceller: CancellationManager,
    store: ProgressStore,
    registry: Arc<JobRegistry>,
    work_dir: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness(max_concurrent_jobs: usize) -> Harness {
    dotenvy::dotenv().ok();

    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let work_dir = dir.path().to_path_buf();

    let config = PipelineConfig {
        max_concurrent_jobs,
        upload_attempts: 3,
        signed_url_ttl: Duration::from_secs(3600),
        work_dir: work_dir.clone(),
    };

    let store = ProgressStore::new(&redis_url()).expect("Failed to create store");
    let channel =
        ProgressChannel::new(&redis_url(), store.clone()).expect("Failed to create channel");
    let registry = Arc::new(JobRegistry::new());
    let finalizer = Arc::new(UploadFinalizer::new(
        Arc::new(NullStore),
        Arc::new(NullCatalog),
        work_dir.clone(),
        config.upload_attempts,
        config.signed_url_ttl,
    ));
    let pipeline = Arc::new(TranscodePipeline::new(
        &config,
        Arc::clone(&registry),
        channel,
        finalizer,
    ));
    let canceller = CancellationManager::new(Arc::clone(&registry), store.clone(), work_dir.clone());

    Harness {
        pipeline,
        canceller,
        store,
        registry,
        work_dir,
        _dir: dir,
    }
}

/// Generate a synthetic source long enough that the encode outlives the test
/// setup.
async fn make_source(path: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=10:size=640x480:rate=25",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=10",
            "-c:v",
            "libx264",
            "-c:a",
            "aac",
            "-shortest",
        ])
        .arg(path)
        .status()
        .await
        .expect("Failed to run ffmpeg");
    assert!(status.success(), "Source generation failed");
}

/// Wait for the job's running snapshot to appear.
async fn wait_until_running(store: &ProgressStore, job_id: &JobId) {
    for _ in 0..50 {
        if store.get(job_id).await.expect("Failed to get").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Job {} never published a running snapshot", job_id);
}

/// Cancel mid-encode: the snapshot must stay gone even though progress
/// events were buffered before the kill.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_cancel_in_flight_leaves_no_traces() {
    let h = harness(2).await;
    let input = h.work_dir.join("source.mp4");
    make_source(&input).await;

    // x265 is slow enough that the encode is mid-flight when we cancel
    let options = EncodeOptions::parse("640x480-libx265").expect("valid option");
    let job_id = h.pipeline.submit(input, "test-user", options).await;

    wait_until_running(&h.store, &job_id).await;

    let outcome = h.canceller.cancel(&job_id).await;
    assert_eq!(outcome, CancelOutcome::Canceled);

    // Let the event pump drain everything that was buffered before the kill
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(
        h.store.get(&job_id).await.expect("Failed to get").is_none(),
        "Snapshot resurrected after cancel"
    );
    assert!(!h.registry.contains(&job_id).await);
    assert!(
        !h.work_dir.join(format!("{}.mp4", job_id)).exists(),
        "Partial output left behind"
    );
}

/// Cancel a job that is still waiting for a worker permit: it must be
/// cancellable immediately and never start.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_cancel_queued_job_never_starts() {
    let h = harness(1).await;
    let input = h.work_dir.join("source.mp4");
    make_source(&input).await;

    let slow = EncodeOptions::parse("640x480-libx265").expect("valid option");
    let queued = EncodeOptions::parse("320x240-libx264").expect("valid option");

    // First job occupies the only permit
    let first = h
        .pipeline
        .submit(input.clone(), "test-user", slow)
        .await;
    wait_until_running(&h.store, &first).await;

    // Second job is queued behind it and canceled right away
    let second = h.pipeline.submit(input, "test-user", queued).await;
    let outcome = h.canceller.cancel(&second).await;
    assert_eq!(outcome, CancelOutcome::Canceled);
    assert!(!h.registry.contains(&second).await);

    // Free the permit; the canceled job must not run
    h.canceller.cancel(&first).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(
        h.store.get(&second).await.expect("Failed to get").is_none(),
        "Canceled queued job published a snapshot"
    );
    assert!(!h.work_dir.join(format!("{}.mp4", second)).exists());
}
