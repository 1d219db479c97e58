//! Transcoding job orchestration.
//!
//! This crate wires the engine, progress channel and artifact store
//! together:
//! - `TranscodePipeline`: bounded-concurrency submission and the per-job
//!   event pump, with first-writer-wins terminal resolution
//! - `UploadFinalizer`: retried upload, metadata persistence, local cleanup
//! - `CancellationManager`: lookup-and-kill plus snapshot/partial cleanup

pub mod cancel;
pub mod config;
pub mod error;
pub mod finalize;
pub mod pipeline;

pub use cancel::{CancelOutcome, CancellationManager};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use finalize::UploadFinalizer;
pub use pipeline::TranscodePipeline;
