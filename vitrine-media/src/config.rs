use serde::{Deserialize, Serialize};

/// Tuning knobs for the cleanup queue worker and its maintenance tasks.
///
/// All fields carry defaults so deployments can adopt individual settings
/// without supplying a full configuration payload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupQueueConfig {
    /// Maximum rows claimed per `process_batch` invocation.
    pub batch_size: usize,
    /// Failure transitions allowed before a row becomes a poison item.
    pub max_retries: i32,
    /// Pause between consecutive blob-delete calls within one batch, to
    /// respect the provider's rate limits.
    pub inter_item_delay_ms: u64,
    /// Upper bound on a single blob-delete call. Exceeding it is recorded
    /// as a failure, not left open.
    pub delete_timeout_ms: u64,
    /// Minimum age of a failure before the retry scheduler re-arms it.
    /// Zero re-arms immediately and leaves backoff to the scheduler's own
    /// invocation interval.
    pub retry_min_age_secs: i64,
    /// Age past which a `processing` claim is considered orphaned by a
    /// crashed worker and swept back to `pending`.
    pub reclaim_after_secs: i64,
    /// Days a completed row is kept before the garbage collector purges it.
    pub gc_retention_days: i64,
}

impl Default for CleanupQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            inter_item_delay_ms: 250,
            delete_timeout_ms: 10_000,
            retry_min_age_secs: 0,
            reclaim_after_secs: 900,
            gc_retention_days: 30,
        }
    }
}

impl CleanupQueueConfig {
    pub fn inter_item_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.inter_item_delay_ms)
    }

    pub fn delete_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delete_timeout_ms)
    }

    pub fn retry_min_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_min_age_secs)
    }

    pub fn reclaim_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reclaim_after_secs)
    }

    pub fn gc_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.gc_retention_days)
    }
}
