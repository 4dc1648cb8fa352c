use std::sync::Arc;

use vitrine_model::QueueStats;

use crate::error::Result;
use crate::queue::CleanupQueueRepository;

/// Read-only queue aggregation for health endpoints and dashboards.
pub struct StatsReporter {
    repo: Arc<dyn CleanupQueueRepository>,
}

impl std::fmt::Debug for StatsReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsReporter").finish()
    }
}

impl StatsReporter {
    pub fn new(repo: Arc<dyn CleanupQueueRepository>) -> Self {
        Self { repo }
    }

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        self.repo.stats().await
    }

    /// Whether the failed backlog has grown past `threshold`, the signal
    /// operators use to run the retry scheduler or investigate poison items.
    pub async fn failed_backlog_exceeds(&self, threshold: u64) -> Result<bool> {
        Ok(self.repo.stats().await?.failed > threshold)
    }
}
