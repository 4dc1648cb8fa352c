use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use vitrine_model::{
    CleanupItemId, CleanupQueueItem, CleanupStatus, NewCleanupItem, QueueStats,
};

use crate::error::{CleanupError, Result};

use super::ports::CleanupQueueRepository;

/// In-memory queue store.
///
/// Implements the exact transition semantics of the Postgres repository so
/// the worker and maintenance tasks can be exercised without a database.
/// The single mutex makes every transition atomic, including the
/// `pending -> processing` claim.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCleanupQueueRepository {
    items: Arc<Mutex<HashMap<CleanupItemId, CleanupQueueItem>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryCleanupQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CleanupQueueRepository for InMemoryCleanupQueueRepository {
    async fn enqueue(&self, item: NewCleanupItem) -> Result<CleanupQueueItem> {
        let id = CleanupItemId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let row = CleanupQueueItem {
            id,
            blob_object_id: item.blob_object_id,
            original_filename: item.original_filename,
            status: CleanupStatus::Pending,
            trigger_source: item.trigger_source,
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
            deleted_at: item.deleted_at,
            processed_at: None,
        };

        let mut guard = self.items.lock().await;
        guard.insert(id, row.clone());
        Ok(row)
    }

    async fn get(
        &self,
        id: CleanupItemId,
    ) -> Result<Option<CleanupQueueItem>> {
        let guard = self.items.lock().await;
        Ok(guard.get(&id).cloned())
    }

    async fn fetch_pending(
        &self,
        limit: i64,
    ) -> Result<Vec<CleanupQueueItem>> {
        let guard = self.items.lock().await;
        let mut pending: Vec<CleanupQueueItem> = guard
            .values()
            .filter(|item| item.status == CleanupStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
        });
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn claim(&self, id: CleanupItemId) -> Result<bool> {
        let mut guard = self.items.lock().await;
        match guard.get_mut(&id) {
            Some(item) if item.status == CleanupStatus::Pending => {
                item.status = CleanupStatus::Processing;
                item.processed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_completed(&self, id: CleanupItemId) -> Result<()> {
        let mut guard = self.items.lock().await;
        match guard.get_mut(&id) {
            Some(item) if item.status == CleanupStatus::Processing => {
                item.status = CleanupStatus::Completed;
                item.error_message = None;
                item.processed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(CleanupError::InvalidTransition(format!(
                "cannot complete item {id}: no processing claim held"
            ))),
        }
    }

    async fn mark_failed(&self, id: CleanupItemId, error: &str) -> Result<()> {
        let mut guard = self.items.lock().await;
        match guard.get_mut(&id) {
            Some(item) if item.status == CleanupStatus::Processing => {
                item.status = CleanupStatus::Failed;
                item.error_message = Some(error.to_string());
                item.retry_count += 1;
                item.processed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(CleanupError::InvalidTransition(format!(
                "cannot fail item {id}: no processing claim held"
            ))),
        }
    }

    async fn requeue_failed(
        &self,
        max_retries: i32,
        min_age: Duration,
    ) -> Result<u64> {
        let cutoff = Utc::now() - min_age;
        let mut guard = self.items.lock().await;
        let mut requeued = 0;
        for item in guard.values_mut() {
            if item.status == CleanupStatus::Failed
                && item.retry_count < max_retries
                && item.processed_at.is_none_or(|at| at <= cutoff)
            {
                item.status = CleanupStatus::Pending;
                item.error_message = None;
                item.processed_at = None;
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn reclaim_stale(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let mut guard = self.items.lock().await;
        let mut reclaimed = 0;
        for item in guard.values_mut() {
            if item.status == CleanupStatus::Processing
                && item.processed_at.is_some_and(|at| at <= cutoff)
            {
                item.status = CleanupStatus::Pending;
                item.processed_at = None;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn purge_completed(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let mut guard = self.items.lock().await;
        let before = guard.len();
        guard.retain(|_, item| {
            !(item.status == CleanupStatus::Completed
                && item.processed_at.is_some_and(|at| at <= cutoff))
        });
        Ok((before - guard.len()) as u64)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let guard = self.items.lock().await;
        let mut stats = QueueStats::default();
        for item in guard.values() {
            match item.status {
                CleanupStatus::Pending => stats.pending += 1,
                CleanupStatus::Processing => stats.processing += 1,
                CleanupStatus::Completed => stats.completed += 1,
                CleanupStatus::Failed => stats.failed += 1,
            }
            stats.total += 1;
        }
        Ok(stats)
    }
}
