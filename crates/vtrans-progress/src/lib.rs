//! Redis-backed progress tracking.
//!
//! This crate provides:
//! - `ProgressStore`: TTL'd key/value snapshots for polling, one key per job
//! - `ProgressChannel`: store write plus pub/sub fan-out to live subscribers

pub mod channel;
pub mod error;
pub mod store;

pub use channel::ProgressChannel;
pub use error::{ProgressError, ProgressResult};
pub use store::{ProgressStore, PROGRESS_TTL_SECS};
