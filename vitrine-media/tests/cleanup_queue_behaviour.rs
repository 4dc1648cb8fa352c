use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Mutex;
use vitrine_media::blob::{BlobStore, DeleteOutcome};
use vitrine_media::config::CleanupQueueConfig;
use vitrine_media::maintenance::{GarbageCollector, RetryScheduler};
use vitrine_media::queue::{
    CleanupQueueRepository, InMemoryCleanupQueueRepository,
};
use vitrine_media::stats::StatsReporter;
use vitrine_media::worker::CleanupWorker;
use vitrine_model::{CleanupStatus, NewCleanupItem};

/// Scripted blob store. Each object id pops outcomes from its script in
/// order; an exhausted (or absent) script reports `NotFound`, matching a
/// provider's idempotent delete semantics.
#[derive(Default)]
struct MockBlobStore {
    scripts: Mutex<HashMap<String, VecDeque<DeleteOutcome>>>,
    calls: Mutex<Vec<String>>,
}

impl MockBlobStore {
    async fn script(
        &self,
        blob_object_id: &str,
        outcomes: impl IntoIterator<Item = DeleteOutcome>,
    ) {
        self.scripts
            .lock()
            .await
            .entry(blob_object_id.to_string())
            .or_default()
            .extend(outcomes);
    }

    async fn calls_for(&self, blob_object_id: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|id| id.as_str() == blob_object_id)
            .count()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn delete(
        &self,
        blob_object_id: &str,
    ) -> vitrine_media::Result<DeleteOutcome> {
        self.calls.lock().await.push(blob_object_id.to_string());
        let mut scripts = self.scripts.lock().await;
        let outcome = scripts
            .get_mut(blob_object_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(DeleteOutcome::NotFound);
        Ok(outcome)
    }
}

/// Blob store that never answers within a test-sized timeout.
struct StalledBlobStore;

#[async_trait]
impl BlobStore for StalledBlobStore {
    async fn delete(
        &self,
        _blob_object_id: &str,
    ) -> vitrine_media::Result<DeleteOutcome> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(DeleteOutcome::Deleted)
    }
}

fn test_config() -> CleanupQueueConfig {
    CleanupQueueConfig {
        inter_item_delay_ms: 0,
        delete_timeout_ms: 2_000,
        ..CleanupQueueConfig::default()
    }
}

fn worker_over(
    repo: &Arc<InMemoryCleanupQueueRepository>,
    store: Arc<dyn BlobStore>,
    config: CleanupQueueConfig,
) -> CleanupWorker {
    let repo: Arc<dyn CleanupQueueRepository> = repo.clone();
    CleanupWorker::new(repo, store, config)
}

#[tokio::test]
async fn successful_delete_completes_the_row() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());
    store.script("x", [DeleteOutcome::Deleted]).await;

    let item = repo
        .enqueue(NewCleanupItem::new("x").with_trigger("ui_delete"))
        .await?;

    let worker = worker_over(&repo, store.clone(), test_config());
    let summary = worker.process_batch(10).await?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.pending_remaining, 0);

    let row = repo.get(item.id).await?.expect("row kept");
    assert_eq!(row.status, CleanupStatus::Completed);
    assert!(row.processed_at.is_some());
    assert!(row.error_message.is_none());
    assert_eq!(store.calls_for("x").await, 1);
    Ok(())
}

#[tokio::test]
async fn transient_failure_is_retried_to_completion() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());
    store
        .script(
            "x",
            [
                DeleteOutcome::Retriable("provider returned 503".into()),
                DeleteOutcome::Deleted,
            ],
        )
        .await;

    let item = repo.enqueue(NewCleanupItem::new("x")).await?;
    let worker = worker_over(&repo, store.clone(), test_config());

    let summary = worker.process_batch(10).await?;
    assert_eq!(summary.failed, 1);

    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Failed);
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.error_message.as_deref(), Some("provider returned 503"));

    let scheduler =
        RetryScheduler::new(repo.clone(), test_config());
    let requeued = scheduler.retry_failed_cleanups(3).await?;
    assert_eq!(requeued, 1);

    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Pending);
    assert!(row.error_message.is_none());

    let summary = worker.process_batch(10).await?;
    assert_eq!(summary.processed, 1);

    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Completed);
    // Retry count documents history; it never decreases.
    assert_eq!(row.retry_count, 1);
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_become_a_poison_item() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());
    store
        .script(
            "x",
            std::iter::repeat_n(
                DeleteOutcome::Retriable("connection reset".into()),
                3,
            ),
        )
        .await;

    let item = repo.enqueue(NewCleanupItem::new("x")).await?;
    let worker = worker_over(&repo, store.clone(), test_config());
    let scheduler =
        RetryScheduler::new(repo.clone(), test_config());

    for _ in 0..3 {
        worker.process_batch(10).await?;
        scheduler.retry_failed_cleanups(3).await?;
    }

    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Failed);
    assert_eq!(row.retry_count, 3);
    assert!(row.is_poison(3));

    // One more scheduler pass must not resurrect it.
    let requeued = scheduler.retry_failed_cleanups(3).await?;
    assert_eq!(requeued, 0);
    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Failed);

    let reporter = StatsReporter::new(repo.clone());
    assert!(reporter.failed_backlog_exceeds(0).await?);
    Ok(())
}

#[tokio::test]
async fn batch_size_caps_how_many_rows_leave_pending() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());

    for i in 0..15 {
        repo.enqueue(NewCleanupItem::new(format!("obj-{i}")))
            .await?;
    }

    let worker = worker_over(&repo, store.clone(), test_config());
    let summary = worker.process_batch(10).await?;

    assert_eq!(summary.processed + summary.failed, 10);
    assert_eq!(summary.pending_remaining, 5);

    let reporter = StatsReporter::new(repo.clone());
    let stats = reporter.queue_stats().await?;
    assert_eq!(stats.pending, 5);
    assert_eq!(stats.completed, 10);
    assert_eq!(stats.total, 15);
    Ok(())
}

#[tokio::test]
async fn garbage_collector_purges_only_old_completed_rows() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());

    let completed = repo.enqueue(NewCleanupItem::new("done")).await?;
    repo.claim(completed.id).await?;
    repo.mark_completed(completed.id).await?;

    let failed = repo.enqueue(NewCleanupItem::new("stuck")).await?;
    repo.claim(failed.id).await?;
    repo.mark_failed(failed.id, "provider down").await?;

    let pending = repo.enqueue(NewCleanupItem::new("waiting")).await?;

    // Zero-day retention makes every completed row eligible without
    // manipulating clocks; age-based filtering is covered by the
    // repository's own tests.
    let gc = GarbageCollector::new(repo.clone());
    let purged = gc.cleanup_old_records(0).await?;
    assert_eq!(purged, 1);

    assert!(repo.get(completed.id).await?.is_none());
    assert!(repo.get(failed.id).await?.is_some());
    assert!(repo.get(pending.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let item = repo.enqueue(NewCleanupItem::new("contested")).await?;

    let attempts = (0..16).map(|_| {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move { repo.claim(item.id).await })
    });

    let results = join_all(attempts).await;
    let winners = results
        .into_iter()
        .map(|joined| joined.expect("task not cancelled").expect("claim ok"))
        .filter(|claimed| *claimed)
        .count();

    assert_eq!(winners, 1);
    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Processing);
    Ok(())
}

#[tokio::test]
async fn duplicate_rows_for_one_blob_both_complete() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());
    // First delete removes the object; the second sees it already gone.
    store
        .script("dup", [DeleteOutcome::Deleted, DeleteOutcome::NotFound])
        .await;

    let first = repo
        .enqueue(NewCleanupItem::new("dup").with_trigger("ui_delete"))
        .await?;
    let second = repo
        .enqueue(NewCleanupItem::new("dup").with_trigger("cascade"))
        .await?;

    let worker = worker_over(&repo, store.clone(), test_config());
    let summary = worker.process_batch(10).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.calls_for("dup").await, 2);

    for id in [first.id, second.id] {
        let row = repo.get(id).await?.expect("row");
        assert_eq!(row.status, CleanupStatus::Completed);
    }
    Ok(())
}

#[tokio::test]
async fn one_failing_item_does_not_abort_the_batch() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());
    store
        .script("bad", [DeleteOutcome::Retriable("tcp reset".into())])
        .await;
    store
        .script(
            "rejected",
            [DeleteOutcome::Permanent("provider returned 403".into())],
        )
        .await;
    store.script("good", [DeleteOutcome::Deleted]).await;

    let bad = repo.enqueue(NewCleanupItem::new("bad")).await?;
    let rejected = repo.enqueue(NewCleanupItem::new("rejected")).await?;
    let good = repo.enqueue(NewCleanupItem::new("good")).await?;

    let worker = worker_over(&repo, store.clone(), test_config());
    let summary = worker.process_batch(10).await?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 2);

    assert_eq!(
        repo.get(bad.id).await?.expect("row").status,
        CleanupStatus::Failed
    );
    assert_eq!(
        repo.get(rejected.id).await?.expect("row").status,
        CleanupStatus::Failed
    );
    assert_eq!(
        repo.get(good.id).await?.expect("row").status,
        CleanupStatus::Completed
    );
    Ok(())
}

#[tokio::test]
async fn retry_scheduler_leaves_unrelated_rows_alone() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());

    let pending = repo.enqueue(NewCleanupItem::new("pending")).await?;

    let processing = repo.enqueue(NewCleanupItem::new("processing")).await?;
    repo.claim(processing.id).await?;

    let completed = repo.enqueue(NewCleanupItem::new("completed")).await?;
    repo.claim(completed.id).await?;
    repo.mark_completed(completed.id).await?;

    let exhausted = repo.enqueue(NewCleanupItem::new("exhausted")).await?;
    repo.claim(exhausted.id).await?;
    repo.mark_failed(exhausted.id, "still broken").await?;

    let scheduler =
        RetryScheduler::new(repo.clone(), test_config());
    // Budget of 1: the exhausted row (retry_count = 1) must not be re-armed.
    let requeued = scheduler.retry_failed_cleanups(1).await?;
    assert_eq!(requeued, 0);

    assert_eq!(
        repo.get(pending.id).await?.expect("row").status,
        CleanupStatus::Pending
    );
    assert_eq!(
        repo.get(processing.id).await?.expect("row").status,
        CleanupStatus::Processing
    );
    assert_eq!(
        repo.get(completed.id).await?.expect("row").status,
        CleanupStatus::Completed
    );
    let exhausted = repo.get(exhausted.id).await?.expect("row");
    assert_eq!(exhausted.status, CleanupStatus::Failed);
    assert_eq!(exhausted.error_message.as_deref(), Some("still broken"));
    Ok(())
}

#[tokio::test]
async fn stalled_delete_is_recorded_as_failure() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let item = repo.enqueue(NewCleanupItem::new("slow")).await?;

    let config = CleanupQueueConfig {
        delete_timeout_ms: 50,
        inter_item_delay_ms: 0,
        ..CleanupQueueConfig::default()
    };
    let worker = worker_over(&repo, Arc::new(StalledBlobStore), config);
    let summary = worker.process_batch(10).await?;

    assert_eq!(summary.failed, 1);
    let row = repo.get(item.id).await?.expect("row");
    assert_eq!(row.status, CleanupStatus::Failed);
    assert_eq!(row.retry_count, 1);
    assert!(
        row.error_message
            .as_deref()
            .is_some_and(|msg| msg.contains("timed out"))
    );
    Ok(())
}

#[tokio::test]
async fn worker_processes_oldest_rows_first() -> Result<()> {
    let repo = Arc::new(InMemoryCleanupQueueRepository::new());
    let store = Arc::new(MockBlobStore::default());

    let oldest = repo.enqueue(NewCleanupItem::new("first")).await?;
    let newer = repo.enqueue(NewCleanupItem::new("second")).await?;
    repo.enqueue(NewCleanupItem::new("third")).await?;

    let worker = worker_over(&repo, store.clone(), test_config());
    worker.process_batch(2).await?;

    // Oldest two drained, newest untouched.
    assert_eq!(
        repo.get(oldest.id).await?.expect("row").status,
        CleanupStatus::Completed
    );
    assert_eq!(
        repo.get(newer.id).await?.expect("row").status,
        CleanupStatus::Completed
    );
    let stats = repo.stats().await?;
    assert_eq!(stats.pending, 1);
    Ok(())
}
