//! FFprobe duration probe.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file's duration in milliseconds.
pub async fn probe_duration_ms(path: impl AsRef<Path>) -> EngineResult<i64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EngineError::InputNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| EngineError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(EngineError::FfprobeFailed {
            message: format!("ffprobe failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let duration_secs: f64 = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| EngineError::FfprobeFailed {
            message: format!("no duration in ffprobe output for {}", path.display()),
            stderr: None,
        })?;

    Ok((duration_secs * 1000.0) as i64)
}
