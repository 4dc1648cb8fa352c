use std::sync::Arc;

use tracing::{debug, error, info, warn};
use vitrine_model::BatchSummary;

use crate::blob::{BlobStore, DeleteOutcome};
use crate::config::CleanupQueueConfig;
use crate::error::Result;
use crate::queue::CleanupQueueRepository;

/// Drains pending cleanup intents against the remote blob store.
///
/// Each instance owns its own batch guard; the guard only prevents
/// overlapping batches within this process. Correctness under horizontal
/// scaling rests entirely on the repository's conditional claim.
pub struct CleanupWorker {
    repo: Arc<dyn CleanupQueueRepository>,
    blob_store: Arc<dyn BlobStore>,
    config: CleanupQueueConfig,
    batch_guard: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for CleanupWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupWorker")
            .field("config", &self.config)
            .finish()
    }
}

impl CleanupWorker {
    pub fn new(
        repo: Arc<dyn CleanupQueueRepository>,
        blob_store: Arc<dyn BlobStore>,
        config: CleanupQueueConfig,
    ) -> Self {
        Self {
            repo,
            blob_store,
            config,
            batch_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Claim and process up to `batch_size` pending rows, oldest first.
    ///
    /// Per-item failures never abort the rest of the batch; each item's
    /// outcome is recorded independently.
    pub async fn process_batch(&self, batch_size: usize) -> Result<BatchSummary> {
        let Ok(_guard) = self.batch_guard.try_lock() else {
            debug!("skipping batch: a batch is already running in this process");
            let stats = self.repo.stats().await?;
            return Ok(BatchSummary {
                pending_remaining: stats.pending,
                ..BatchSummary::default()
            });
        };

        let candidates = self.repo.fetch_pending(batch_size as i64).await?;
        debug!(candidates = candidates.len(), "starting cleanup batch");

        let mut summary = BatchSummary::default();
        let mut first = true;
        for item in candidates {
            // Another worker instance may have raced us between the fetch
            // and this claim; zero rows affected means it won.
            if !self.repo.claim(item.id).await? {
                debug!(item_id = %item.id, "lost claim race, skipping");
                continue;
            }

            if !first {
                tokio::time::sleep(self.config.inter_item_delay()).await;
            }
            first = false;

            let outcome = tokio::time::timeout(
                self.config.delete_timeout(),
                self.blob_store.delete(&item.blob_object_id),
            )
            .await;

            match outcome {
                Ok(Ok(DeleteOutcome::Deleted)) => {
                    self.repo.mark_completed(item.id).await?;
                    summary.processed += 1;
                }
                Ok(Ok(DeleteOutcome::NotFound)) => {
                    // Already absent satisfies the cleanup goal, and keeps
                    // duplicate rows for the same blob harmless.
                    debug!(
                        item_id = %item.id,
                        blob_object_id = %item.blob_object_id,
                        "blob already absent, treating as completed"
                    );
                    self.repo.mark_completed(item.id).await?;
                    summary.processed += 1;
                }
                Ok(Ok(DeleteOutcome::Retriable(reason))) => {
                    warn!(
                        item_id = %item.id,
                        blob_object_id = %item.blob_object_id,
                        error = %reason,
                        "blob delete failed, will retry"
                    );
                    self.repo.mark_failed(item.id, &reason).await?;
                    summary.failed += 1;
                }
                Ok(Ok(DeleteOutcome::Permanent(reason))) => {
                    error!(
                        item_id = %item.id,
                        blob_object_id = %item.blob_object_id,
                        error = %reason,
                        "blob delete rejected by provider"
                    );
                    self.repo.mark_failed(item.id, &reason).await?;
                    summary.failed += 1;
                }
                Ok(Err(e)) => {
                    let reason = e.to_string();
                    warn!(
                        item_id = %item.id,
                        blob_object_id = %item.blob_object_id,
                        error = %reason,
                        "blob delete errored, will retry"
                    );
                    self.repo.mark_failed(item.id, &reason).await?;
                    summary.failed += 1;
                }
                Err(_elapsed) => {
                    let reason = format!(
                        "blob delete timed out after {}ms",
                        self.config.delete_timeout_ms
                    );
                    warn!(
                        item_id = %item.id,
                        blob_object_id = %item.blob_object_id,
                        "{reason}"
                    );
                    self.repo.mark_failed(item.id, &reason).await?;
                    summary.failed += 1;
                }
            }
        }

        summary.pending_remaining = self.repo.stats().await?.pending;
        info!(
            processed = summary.processed,
            failed = summary.failed,
            pending_remaining = summary.pending_remaining,
            "cleanup batch finished"
        );
        Ok(summary)
    }
}
