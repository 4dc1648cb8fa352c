//! Periodic maintenance over the cleanup queue.
//!
//! Both tasks are run-to-completion functions invoked by an external
//! scheduling harness (cron, timer job). They are deliberately separate from
//! the worker so "detect transient failure" and "give up" stay independently
//! controllable policies.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CleanupQueueConfig;
use crate::error::Result;
use crate::queue::CleanupQueueRepository;

/// Re-arms failed-but-not-exhausted rows and sweeps orphaned claims.
pub struct RetryScheduler {
    repo: Arc<dyn CleanupQueueRepository>,
    config: CleanupQueueConfig,
}

impl std::fmt::Debug for RetryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryScheduler")
            .field("config", &self.config)
            .finish()
    }
}

impl RetryScheduler {
    pub fn new(
        repo: Arc<dyn CleanupQueueRepository>,
        config: CleanupQueueConfig,
    ) -> Self {
        Self { repo, config }
    }

    /// Move `failed` rows with `retry_count < max_retries` back to
    /// `pending`. Rows at the retry budget stay `failed` as poison items
    /// for an operator, visible through queue stats.
    pub async fn retry_failed_cleanups(&self, max_retries: i32) -> Result<u64> {
        let requeued = self
            .repo
            .requeue_failed(max_retries, self.config.retry_min_age())
            .await?;

        if requeued > 0 {
            info!(requeued, "re-armed failed cleanup items");
        }

        let stats = self.repo.stats().await?;
        if stats.failed > 0 {
            warn!(
                failed = stats.failed,
                "cleanup items remain failed after re-arm; items at the \
                 retry budget need operator attention"
            );
        }

        Ok(requeued)
    }

    /// Return `processing` rows whose claim outlived `reclaim_after` to
    /// `pending`. Required for correctness under crash-restart: a worker
    /// that dies mid-call would otherwise strand its claims forever.
    pub async fn reclaim_stale_claims(&self) -> Result<u64> {
        let reclaimed = self
            .repo
            .reclaim_stale(self.config.reclaim_after())
            .await?;

        if reclaimed > 0 {
            warn!(
                reclaimed,
                "reclaimed orphaned processing claims from a crashed worker"
            );
        }

        Ok(reclaimed)
    }
}

/// Purges old completed rows to bound queue storage growth.
pub struct GarbageCollector {
    repo: Arc<dyn CleanupQueueRepository>,
}

impl std::fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarbageCollector").finish()
    }
}

impl GarbageCollector {
    pub fn new(repo: Arc<dyn CleanupQueueRepository>) -> Self {
        Self { repo }
    }

    /// Delete `completed` rows processed more than `days_old` days ago.
    /// Rows in any other status are never purged by age alone: losing a
    /// `failed` or `pending` record would silently abandon a cleanup
    /// obligation.
    pub async fn cleanup_old_records(&self, days_old: i64) -> Result<u64> {
        let purged = self
            .repo
            .purge_completed(chrono::Duration::days(days_old))
            .await?;

        if purged > 0 {
            info!(purged, days_old, "purged old completed cleanup records");
        }

        Ok(purged)
    }
}
