//! One FFmpeg invocation per job, with progress events and cancellation.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use vtrans_models::{EncodeOptions, JobId};

use crate::command::TranscodeCommand;
use crate::error::{EngineError, EngineResult};
use crate::probe::probe_duration_ms;
use crate::progress::{parse_progress_line, FfmpegProgress};

/// Buffered events per engine before the emitter blocks.
const EVENT_BUFFER: usize = 64;

/// How many trailing stderr lines to keep for failure messages.
const STDERR_TAIL: usize = 5;

/// Event emitted by a running engine.
///
/// `Progress` events are ordered and the final event is exactly one of
/// `Completed`, `Failed` or `Canceled`; nothing follows a terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress { percent: u8 },
    Completed,
    Failed { error: String },
    Canceled,
}

/// Control handle for a running engine instance.
///
/// The handle is an owned, non-clonable resource; the registry holds it
/// exclusively while the job runs and whoever takes it out owns the job's
/// terminal outcome.
#[derive(Debug)]
pub struct EngineHandle {
    job_id: JobId,
    cancel_tx: watch::Sender<bool>,
    terminated_rx: watch::Receiver<bool>,
}

impl EngineHandle {
    pub(crate) fn new(
        job_id: JobId,
        cancel_tx: watch::Sender<bool>,
        terminated_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            job_id,
            cancel_tx,
            terminated_rx,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Whether the underlying process has been reaped.
    pub fn is_finished(&self) -> bool {
        *self.terminated_rx.borrow()
    }

    /// Request termination and wait until the child has been reaped.
    ///
    /// Safe to call more than once; a no-op when the job already reached a
    /// terminal state. After this returns the output file is no longer being
    /// written, so partial output may be deleted.
    pub async fn cancel(&mut self) {
        let _ = self.cancel_tx.send(true);

        while !*self.terminated_rx.borrow_and_update() {
            if self.terminated_rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Spawns and supervises FFmpeg for one job.
pub struct TranscodingEngine;

impl TranscodingEngine {
    /// Start an encode. Validates the toolchain and the input before
    /// spawning (fail fast), then returns a control handle plus the ordered
    /// event stream. The caller owns pumping the events.
    pub async fn start(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        options: &EncodeOptions,
        job_id: &JobId,
    ) -> EngineResult<(EngineHandle, mpsc::Receiver<EngineEvent>)> {
        let input = input.as_ref();

        which::which("ffmpeg").map_err(|_| EngineError::FfmpegNotFound)?;
        if !input.exists() {
            return Err(EngineError::InputNotFound(input.to_path_buf()));
        }
        let duration_ms = probe_duration_ms(input).await?;

        let cmd = TranscodeCommand::for_options(input, output.as_ref(), options);
        let args = cmd.build_args();
        debug!(job_id = %job_id, "Spawning ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            EngineError::ffmpeg_failed("stderr not captured", None)
        })?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (terminated_tx, terminated_rx) = watch::channel(false);

        // Drain stderr concurrently with wait(): progress blocks become
        // Progress events (monotone percent), everything else is kept as a
        // tail for failure messages.
        let progress_tx = events_tx.clone();
        let parser = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut last_percent = 0u8;
            let mut tail: Vec<String> = Vec::new();

            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    let percent = (progress.percentage(duration_ms) as u8).max(last_percent);
                    if percent > last_percent || last_percent == 0 {
                        last_percent = percent;
                        if progress_tx
                            .send(EngineEvent::Progress { percent })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                } else if !line.trim().is_empty() && !line.contains('=') {
                    if tail.len() == STDERR_TAIL {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            let mut cancel_alive = true;
            let status = loop {
                if !cancel_alive {
                    break child.wait().await;
                }
                tokio::select! {
                    status = child.wait() => break status,
                    changed = cancel_rx.changed() => match changed {
                        Ok(()) if *cancel_rx.borrow() => {
                            info!(job_id = %task_job_id, "Cancel requested, killing ffmpeg");
                            let _ = child.start_kill();
                            let _ = child.wait().await;
                            let _ = parser.await;
                            let _ = events_tx.send(EngineEvent::Canceled).await;
                            let _ = terminated_tx.send(true);
                            return;
                        }
                        Ok(()) => {}
                        // Handle dropped; run to completion without cancel.
                        Err(_) => cancel_alive = false,
                    },
                }
            };

            let tail = parser.await.unwrap_or_default();

            let event = match status {
                Ok(status) if status.success() => {
                    info!(job_id = %task_job_id, "Transcoding succeeded");
                    EngineEvent::Completed
                }
                Ok(status) => {
                    let detail = if tail.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", tail.join("; "))
                    };
                    warn!(job_id = %task_job_id, ?status, "Transcoding failed");
                    EngineEvent::Failed {
                        error: format!(
                            "ffmpeg exited with status {}{}",
                            status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".into()),
                            detail
                        ),
                    }
                }
                Err(e) => EngineEvent::Failed {
                    error: format!("failed to wait for ffmpeg: {}", e),
                },
            };

            let _ = events_tx.send(event).await;
            let _ = terminated_tx.send(true);
        });

        Ok((
            EngineHandle::new(job_id.clone(), cancel_tx, terminated_rx),
            events_rx,
        ))
    }
}
