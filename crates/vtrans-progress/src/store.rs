//! TTL'd snapshot store.
//!
//! One key per job (`progress:{job_id}`), holding the latest serialized
//! snapshot. Writes replace the previous value and reset the TTL, so at most
//! one snapshot exists per job at any time. A key that expired or was never
//! written reads back as `None`; that is the valid "unknown" state.

use redis::AsyncCommands;
use tracing::debug;

use vtrans_models::{JobId, ProgressSnapshot};

use crate::error::ProgressResult;

/// Snapshot TTL: abandoned entries vanish after 10 minutes.
pub const PROGRESS_TTL_SECS: u64 = 600;

/// Durable progress snapshot store.
#[derive(Clone)]
pub struct ProgressStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl ProgressStore {
    /// Create a new store with the default TTL.
    pub fn new(redis_url: &str) -> ProgressResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            ttl_secs: PROGRESS_TTL_SECS,
        })
    }

    /// Override the snapshot TTL.
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Redis key for a job's snapshot.
    pub fn key(job_id: &JobId) -> String {
        format!("progress:{}", job_id)
    }

    /// Write a snapshot, replacing any previous one and resetting the TTL.
    pub async fn set(&self, snapshot: &ProgressSnapshot) -> ProgressResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::key(&snapshot.job_id);
        let payload = serde_json::to_string(snapshot)?;

        debug!(job_id = %snapshot.job_id, percent = snapshot.percent, "Caching snapshot");
        conn.set_ex::<_, _, ()>(key, payload, self.ttl_secs).await?;
        Ok(())
    }

    /// Read the latest snapshot for a job, if one exists.
    pub async fn get(&self, job_id: &JobId) -> ProgressResult<Option<ProgressSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::key(job_id)).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a job's snapshot. Returns whether an entry existed.
    pub async fn delete(&self, job_id: &JobId) -> ProgressResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: u64 = conn.del(Self::key(job_id)).await?;

        debug!(job_id = %job_id, removed, "Deleted snapshot");
        Ok(removed > 0)
    }

    /// Check connectivity (readiness probe).
    pub async fn ping(&self) -> ProgressResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_key() {
        let id = JobId::from_string("1700000000000-ab12");
        assert_eq!(ProgressStore::key(&id), "progress:1700000000000-ab12");
    }
}
