//! S3-compatible artifact storage.
//!
//! This crate provides:
//! - Presigned upload/download URL generation, namespaced per user
//! - Upload of local files through presigned URLs
//! - Artifact metadata records persisted alongside the stored objects

pub mod catalog;
pub mod client;
pub mod error;

pub use catalog::{ArtifactCatalog, ObjectCatalog};
pub use client::{ArtifactStore, S3Config, S3Store, SIGNED_URL_TTL_SECS};
pub use error::{StorageError, StorageResult};
