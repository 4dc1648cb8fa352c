use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use vitrine_model::{
    CleanupItemId, CleanupQueueItem, CleanupStatus, NewCleanupItem, QueueStats,
};

use crate::error::{CleanupError, Result};

use super::ports::CleanupQueueRepository;

const ITEM_COLUMNS: &str = "id, blob_object_id, original_filename, status, \
     trigger_source, error_message, retry_count, created_at, deleted_at, \
     processed_at";

#[derive(Clone)]
pub struct PostgresCleanupQueueRepository {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresCleanupQueueRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCleanupQueueRepository")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresCleanupQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<CleanupQueueItem> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| CleanupError::Internal(format!("Failed to read id: {e}")))?;
        let blob_object_id: String = row
            .try_get("blob_object_id")
            .map_err(|e| CleanupError::Internal(format!("Failed to read blob_object_id: {e}")))?;
        let original_filename: Option<String> = row
            .try_get("original_filename")
            .map_err(|e| CleanupError::Internal(format!("Failed to read original_filename: {e}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| CleanupError::Internal(format!("Failed to read status: {e}")))?;
        let status: CleanupStatus = status
            .parse()
            .map_err(|e| CleanupError::Internal(format!("Corrupt status column: {e}")))?;
        let trigger_source: Option<String> = row
            .try_get("trigger_source")
            .map_err(|e| CleanupError::Internal(format!("Failed to read trigger_source: {e}")))?;
        let error_message: Option<String> = row
            .try_get("error_message")
            .map_err(|e| CleanupError::Internal(format!("Failed to read error_message: {e}")))?;
        let retry_count: i32 = row
            .try_get("retry_count")
            .map_err(|e| CleanupError::Internal(format!("Failed to read retry_count: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| CleanupError::Internal(format!("Failed to read created_at: {e}")))?;
        let deleted_at: Option<DateTime<Utc>> = row
            .try_get("deleted_at")
            .map_err(|e| CleanupError::Internal(format!("Failed to read deleted_at: {e}")))?;
        let processed_at: Option<DateTime<Utc>> = row
            .try_get("processed_at")
            .map_err(|e| CleanupError::Internal(format!("Failed to read processed_at: {e}")))?;

        Ok(CleanupQueueItem {
            id: CleanupItemId(id),
            blob_object_id,
            original_filename,
            status,
            trigger_source,
            error_message,
            retry_count,
            created_at,
            deleted_at,
            processed_at,
        })
    }
}

#[async_trait]
impl CleanupQueueRepository for PostgresCleanupQueueRepository {
    async fn enqueue(&self, item: NewCleanupItem) -> Result<CleanupQueueItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO media_cleanup_queue
                (blob_object_id, original_filename, trigger_source, deleted_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&item.blob_object_id)
        .bind(&item.original_filename)
        .bind(&item.trigger_source)
        .bind(item.deleted_at)
        .fetch_one(self.pool())
        .await?;

        Self::map_row(&row)
    }

    async fn get(
        &self,
        id: CleanupItemId,
    ) -> Result<Option<CleanupQueueItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM media_cleanup_queue WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn fetch_pending(
        &self,
        limit: i64,
    ) -> Result<Vec<CleanupQueueItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM media_cleanup_queue
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn claim(&self, id: CleanupItemId) -> Result<bool> {
        // The WHERE guard on the source state is the compare-and-swap that
        // keeps horizontally scaled workers from double-claiming a row.
        let result = sqlx::query(
            r#"
            UPDATE media_cleanup_queue
            SET status = 'processing', processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.0)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(&self, id: CleanupItemId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE media_cleanup_queue
            SET status = 'completed', error_message = NULL, processed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id.0)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CleanupError::InvalidTransition(format!(
                "cannot complete item {id}: no processing claim held"
            )));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: CleanupItemId, error: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE media_cleanup_queue
            SET status = 'failed',
                error_message = $2,
                retry_count = retry_count + 1,
                processed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id.0)
        .bind(error)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CleanupError::InvalidTransition(format!(
                "cannot fail item {id}: no processing claim held"
            )));
        }
        Ok(())
    }

    async fn requeue_failed(
        &self,
        max_retries: i32,
        min_age: Duration,
    ) -> Result<u64> {
        let cutoff = Utc::now() - min_age;
        let result = sqlx::query(
            r#"
            UPDATE media_cleanup_queue
            SET status = 'pending', error_message = NULL, processed_at = NULL
            WHERE status = 'failed'
              AND retry_count < $1
              AND (processed_at IS NULL OR processed_at <= $2)
            "#,
        )
        .bind(max_retries)
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn reclaim_stale(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query(
            r#"
            UPDATE media_cleanup_queue
            SET status = 'pending', processed_at = NULL
            WHERE status = 'processing' AND processed_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_completed(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query(
            r#"
            DELETE FROM media_cleanup_queue
            WHERE status = 'completed' AND processed_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM media_cleanup_queue
            GROUP BY status
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row
                .try_get("status")
                .map_err(|e| CleanupError::Internal(format!("Failed to read status: {e}")))?;
            let count: i64 = row
                .try_get("count")
                .map_err(|e| CleanupError::Internal(format!("Failed to read count: {e}")))?;
            let count = count as u64;
            match status.parse::<CleanupStatus>().map_err(|e| {
                CleanupError::Internal(format!("Corrupt status column: {e}"))
            })? {
                CleanupStatus::Pending => stats.pending = count,
                CleanupStatus::Processing => stats.processing = count,
                CleanupStatus::Completed => stats.completed = count,
                CleanupStatus::Failed => stats.failed = count,
            }
            stats.total += count;
        }
        Ok(stats)
    }
}
