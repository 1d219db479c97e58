//! End-to-end engine tests against a real FFmpeg binary.

use std::path::Path;

use tokio::process::Command;

use vtrans_engine::{EngineEvent, TranscodingEngine};
use vtrans_models::{EncodeOptions, JobId};

/// Generate a short synthetic source video.
async fn make_source(path: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=2:size=320x240:rate=10",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=2",
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

#[tokio::test]
#[ignore = "requires FFmpeg"]
async fn test_transcode_to_completion() {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let input = dir.path().join("source.mp4");
    make_source(&input).await;

    let job_id = JobId::new();
    let options = EncodeOptions::parse("160x120-libx264").expect("valid option");
    let output = dir.path().join(options.output_filename(&job_id));

    let (handle, mut events) = TranscodingEngine::start(&input, &output, &options, &job_id)
        .await
        .expect("Failed to start engine");

    let mut saw_progress = false;
    let mut last_percent = 0u8;
    let terminal = loop {
        match events.recv().await.expect("Event stream closed early") {
            EngineEvent::Progress { percent } => {
                assert!(percent >= last_percent, "Progress went backwards");
                last_percent = percent;
                saw_progress = true;
            }
            other => break other,
        }
    };

    assert_eq!(terminal, EngineEvent::Completed);
    assert!(saw_progress, "No progress events before completion");
    assert!(events.recv().await.is_none(), "Events after terminal event");
    assert!(handle.is_finished());
    assert!(output.exists(), "Output artifact missing");
}

#[tokio::test]
#[ignore = "requires FFmpeg"]
async fn test_cancel_kills_ffmpeg() {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let input = dir.path().join("source.mp4");
    make_source(&input).await;

    let job_id = JobId::new();
    // Slow codec so the encode is still running when we cancel
    let options = EncodeOptions::parse("320x240-libx265").expect("valid option");
    let output = dir.path().join(options.output_filename(&job_id));

    let (mut handle, mut events) = TranscodingEngine::start(&input, &output, &options, &job_id)
        .await
        .expect("Failed to start engine");

    handle.cancel().await;
    assert!(handle.is_finished());

    let terminal = loop {
        match events.recv().await.expect("Event stream closed early") {
            EngineEvent::Progress { .. } => {}
            other => break other,
        }
    };
    assert_eq!(terminal, EngineEvent::Canceled);
}

#[tokio::test]
#[ignore = "requires FFmpeg"]
async fn test_corrupt_input_fails() {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let input = dir.path().join("garbage.mp4");
    tokio::fs::write(&input, b"not a video").await.expect("write failed");

    let job_id = JobId::new();
    let options = EncodeOptions::parse("160x120-libx264").expect("valid option");
    let output = dir.path().join(options.output_filename(&job_id));

    // The probe rejects unreadable input before ffmpeg is spawned.
    let result = TranscodingEngine::start(&input, &output, &options, &job_id).await;
    assert!(result.is_err());
}
