//! Progress fan-out via Redis Pub/Sub.
//!
//! Every publish writes the snapshot to the store first (unconditional,
//! overwrite + TTL) and then broadcasts it on the job's pub/sub channel.
//! Broadcast is best-effort: a missing or slow subscriber never blocks or
//! fails the store write. Subscribers are decoupled from the engine; a
//! disconnect tears down only the subscription.

use std::pin::Pin;

use futures_util::Stream;
use redis::AsyncCommands;
use tracing::{debug, warn};

use vtrans_models::{JobId, ProgressSnapshot};

use crate::error::ProgressResult;
use crate::store::ProgressStore;

/// Channel for publishing/subscribing to progress snapshots.
#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
    store: ProgressStore,
}

impl ProgressChannel {
    /// Create a new progress channel sharing the given store.
    pub fn new(redis_url: &str, store: ProgressStore) -> ProgressResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, store })
    }

    /// Pub/sub channel name for a job.
    pub fn channel_name(job_id: &JobId) -> String {
        format!("progress-events:{}", job_id)
    }

    /// The backing snapshot store.
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Publish a snapshot: store write first, then best-effort broadcast.
    pub async fn publish(&self, snapshot: &ProgressSnapshot) -> ProgressResult<()> {
        self.store.set(snapshot).await?;

        if let Err(e) = self.broadcast(snapshot).await {
            warn!(job_id = %snapshot.job_id, "Progress broadcast failed: {}", e);
        }
        Ok(())
    }

    async fn broadcast(&self, snapshot: &ProgressSnapshot) -> ProgressResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&snapshot.job_id);
        let payload = serde_json::to_string(snapshot)?;

        debug!(job_id = %snapshot.job_id, "Broadcasting snapshot to {}", channel);
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    /// Subscribe to live snapshots for a job.
    /// Returns a pinned stream that can be polled with `.next()`; it yields
    /// nothing until an event arrives, which is the correct behavior for
    /// unknown or expired jobs.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> ProgressResult<Pin<Box<dyn Stream<Item = ProgressSnapshot> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::channel_name(job_id)).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}
