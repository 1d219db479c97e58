//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Local artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("Upload failed after {attempts} attempts: {last_error}")]
    UploadRetriesExhausted { attempts: u32, last_error: String },

    #[error("Engine error: {0}")]
    Engine(#[from] vtrans_engine::EngineError),

    #[error("Storage error: {0}")]
    Storage(#[from] vtrans_storage::StorageError),

    #[error("Progress error: {0}")]
    Progress(#[from] vtrans_progress::ProgressError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
