//! FFmpeg transcoding engine.
//!
//! This crate provides:
//! - FFmpeg command construction from validated encode options
//! - `-progress` output parsing
//! - One engine instance per job, emitting ordered progress events and
//!   exactly one terminal event, with kill-based cancellation
//! - The process-wide job registry used for lookup-and-cancel

pub mod command;
pub mod engine;
pub mod error;
pub mod probe;
pub mod progress;
pub mod registry;

pub use command::TranscodeCommand;
pub use engine::{EngineEvent, EngineHandle, TranscodingEngine};
pub use error::{EngineError, EngineResult};
pub use probe::probe_duration_ms;
pub use progress::FfmpegProgress;
pub use registry::{JobRegistry, TakenJob};
