use async_trait::async_trait;
use chrono::Duration;
use vitrine_model::{
    CleanupItemId, CleanupQueueItem, NewCleanupItem, QueueStats,
};

use crate::error::Result;

/// Storage port for the cleanup reconciliation queue.
///
/// The conditional `pending -> processing` claim is the sole cross-process
/// correctness boundary; every other mutation also names its required source
/// state so no row is ever touched by two components at once.
#[async_trait]
pub trait CleanupQueueRepository: Send + Sync {
    /// Insert a new `pending` intent. This is the enqueuer contract: catalog
    /// delete paths call it exactly once per blob-backed deletion.
    async fn enqueue(&self, item: NewCleanupItem) -> Result<CleanupQueueItem>;

    async fn get(&self, id: CleanupItemId)
    -> Result<Option<CleanupQueueItem>>;

    /// Up to `limit` `pending` rows, oldest first.
    async fn fetch_pending(&self, limit: i64)
    -> Result<Vec<CleanupQueueItem>>;

    /// Compare-and-swap claim: `pending -> processing`, stamping
    /// `processed_at`. Returns `false` when another worker already holds the
    /// row (zero rows affected).
    async fn claim(&self, id: CleanupItemId) -> Result<bool>;

    /// `processing -> completed`. Errors with
    /// [`CleanupError::InvalidTransition`](crate::error::CleanupError) if the
    /// caller does not hold a `processing` claim on the row.
    async fn mark_completed(&self, id: CleanupItemId) -> Result<()>;

    /// `processing -> failed`, recording `error_message` and incrementing
    /// `retry_count`. Same claim requirement as [`mark_completed`].
    ///
    /// [`mark_completed`]: CleanupQueueRepository::mark_completed
    async fn mark_failed(&self, id: CleanupItemId, error: &str)
    -> Result<()>;

    /// Re-arm failed rows: `failed -> pending` for rows with
    /// `retry_count < max_retries` whose failure is at least `min_age` old,
    /// clearing `error_message` and `processed_at`. Exhausted rows are left
    /// untouched. Returns the number of rows re-armed.
    async fn requeue_failed(
        &self,
        max_retries: i32,
        min_age: Duration,
    ) -> Result<u64>;

    /// Sweep orphaned claims: `processing -> pending` for rows whose claim
    /// is older than `older_than` (the worker that held them crashed).
    /// `retry_count` is not incremented. Returns the number of rows swept.
    async fn reclaim_stale(&self, older_than: Duration) -> Result<u64>;

    /// Purge `completed` rows with `processed_at` older than `older_than`.
    /// Rows in any other status are never purged by age alone. Returns the
    /// number of rows deleted.
    async fn purge_completed(&self, older_than: Duration) -> Result<u64>;

    /// Per-status row counts for dashboards and retry/alert decisions.
    async fn stats(&self) -> Result<QueueStats>;
}
