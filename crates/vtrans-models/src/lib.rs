//! Shared data models for the vtrans transcoding service.

pub mod artifact;
pub mod job;
pub mod options;
pub mod snapshot;

pub use artifact::ArtifactMetadata;
pub use job::{JobId, JobStatus};
pub use options::{Codec, EncodeOptions, OptionsError};
pub use snapshot::ProgressSnapshot;
