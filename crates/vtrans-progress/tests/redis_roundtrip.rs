//! Redis-backed store and pub/sub integration tests.

use std::time::Duration;

use futures_util::StreamExt;

use vtrans_models::{EncodeOptions, JobId, JobStatus, ProgressSnapshot};
use vtrans_progress::{ProgressChannel, ProgressStore};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

fn snapshot(job_id: &JobId) -> ProgressSnapshot {
    let options = EncodeOptions::parse("1280x720-libx264").expect("valid option");
    ProgressSnapshot::running(job_id.clone(), "test-user", &options)
}

/// Snapshot round trip: write, read back, delete, read back nothing.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_store_roundtrip() {
    dotenvy::dotenv().ok();

    let store = ProgressStore::new(&redis_url()).expect("Failed to create store");
    let job_id = JobId::new();

    store.set(&snapshot(&job_id)).await.expect("Failed to set");

    let read = store
        .get(&job_id)
        .await
        .expect("Failed to get")
        .expect("Snapshot missing");
    assert_eq!(read.job_id, job_id);
    assert_eq!(read.status, JobStatus::Running);
    assert_eq!(read.percent, 0);

    assert!(store.delete(&job_id).await.expect("Failed to delete"));
    assert!(store.get(&job_id).await.expect("Failed to get").is_none());
}

/// Deleting a snapshot that never existed reports false, not an error.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_delete_unknown_job() {
    dotenvy::dotenv().ok();

    let store = ProgressStore::new(&redis_url()).expect("Failed to create store");
    let deleted = store.delete(&JobId::new()).await.expect("Failed to delete");
    assert!(!deleted);
}

/// A short TTL expires the snapshot back to the "unknown" state.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_snapshot_ttl_expiry() {
    dotenvy::dotenv().ok();

    let store = ProgressStore::new(&redis_url())
        .expect("Failed to create store")
        .with_ttl(1);
    let job_id = JobId::new();

    store.set(&snapshot(&job_id)).await.expect("Failed to set");
    assert!(store.get(&job_id).await.expect("Failed to get").is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(store.get(&job_id).await.expect("Failed to get").is_none());
}

/// Publish writes the store and fans out to a live subscriber.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_and_subscribe() {
    dotenvy::dotenv().ok();

    let store = ProgressStore::new(&redis_url()).expect("Failed to create store");
    let channel = ProgressChannel::new(&redis_url(), store.clone()).expect("Failed to create channel");

    let job_id = JobId::new();
    let initial = snapshot(&job_id);

    // Subscribe in a separate task
    let channel_clone = channel.clone();
    let job_id_clone = job_id.clone();
    let subscriber = tokio::spawn(async move {
        let mut stream = channel_clone
            .subscribe(&job_id_clone)
            .await
            .expect("Failed to subscribe");
        let mut received = Vec::new();

        let timeout = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = stream.next().await {
                let done = event.status.is_terminal();
                received.push(event);
                if done {
                    break;
                }
            }
        });

        let _ = timeout.await;
        received
    });

    // Give subscriber time to connect
    tokio::time::sleep(Duration::from_millis(100)).await;

    channel.publish(&initial).await.expect("Failed to publish");
    channel
        .publish(&initial.with_percent(50))
        .await
        .expect("Failed to publish");
    channel
        .publish(&initial.completed())
        .await
        .expect("Failed to publish");

    let received = subscriber.await.expect("Subscriber task failed");
    assert_eq!(received.len(), 3);
    assert_eq!(received[1].percent, 50);
    assert_eq!(received[2].status, JobStatus::Completed);
    assert_eq!(received[2].percent, 100);

    // The store holds the latest snapshot independently of the broadcast
    let stored = store
        .get(&job_id)
        .await
        .expect("Failed to get")
        .expect("Snapshot missing");
    assert_eq!(stored.status, JobStatus::Completed);

    store.delete(&job_id).await.ok();
}

/// Subscribers on different jobs never see each other's events.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_no_cross_job_fanout() {
    dotenvy::dotenv().ok();

    let store = ProgressStore::new(&redis_url()).expect("Failed to create store");
    let channel = ProgressChannel::new(&redis_url(), store.clone()).expect("Failed to create channel");

    let job_a = JobId::new();
    let job_b = JobId::new();

    let channel_clone = channel.clone();
    let job_b_clone = job_b.clone();
    let subscriber = tokio::spawn(async move {
        let mut stream = channel_clone
            .subscribe(&job_b_clone)
            .await
            .expect("Failed to subscribe");
        tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .ok()
            .flatten()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    channel.publish(&snapshot(&job_a)).await.expect("Failed to publish");

    let received = subscriber.await.expect("Subscriber task failed");
    assert!(received.is_none());

    store.delete(&job_a).await.ok();
}
