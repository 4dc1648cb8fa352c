//! Records for the media blob cleanup reconciliation queue.
//!
//! A row is enqueued whenever a blob-backed catalog record is deleted through
//! a path that does not itself call the blob provider. The cleanup worker in
//! `vitrine-media` drains these rows against the remote store.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::CleanupItemId;

/// Lifecycle state of a cleanup intent.
///
/// Transitions are restricted to:
/// `pending -> processing -> {completed | failed}` and
/// `failed -> pending` (retry scheduler only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CleanupStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CleanupStatus {
    /// Lowercase wire/storage form, matching the `media_cleanup_queue`
    /// CHECK constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupStatus::Pending => "pending",
            CleanupStatus::Processing => "processing",
            CleanupStatus::Completed => "completed",
            CleanupStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CleanupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cleanup status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for CleanupStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CleanupStatus::Pending),
            "processing" => Ok(CleanupStatus::Processing),
            "completed" => Ok(CleanupStatus::Completed),
            "failed" => Ok(CleanupStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// One deletion intent: "this blob must eventually be removed from the
/// remote store".
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CleanupQueueItem {
    pub id: CleanupItemId,
    /// Object key in the remote blob store. Immutable once enqueued.
    pub blob_object_id: String,
    /// Informational only; never used for lookups.
    pub original_filename: Option<String>,
    pub status: CleanupStatus,
    /// Audit tag describing what caused the enqueue
    /// (`ui_delete`, `admin_bulk`, `cascade`, ...).
    pub trigger_source: Option<String>,
    /// Set only while `status == Failed`; cleared when re-armed.
    pub error_message: Option<String>,
    /// Incremented on every failure transition, never decremented.
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    /// Catalog-side deletion time reported by the enqueuer.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Last time the worker moved the row away from `pending`.
    pub processed_at: Option<DateTime<Utc>>,
}

impl CleanupQueueItem {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, CleanupStatus::Completed)
    }

    /// A failed row that exhausted its retry budget. Requires operator
    /// intervention; surfaced through [`QueueStats`].
    pub fn is_poison(&self, max_retries: i32) -> bool {
        matches!(self.status, CleanupStatus::Failed)
            && self.retry_count >= max_retries
    }
}

/// Insert payload used by catalog delete paths (the enqueuer contract).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewCleanupItem {
    pub blob_object_id: String,
    pub original_filename: Option<String>,
    pub trigger_source: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl NewCleanupItem {
    pub fn new(blob_object_id: impl Into<String>) -> Self {
        Self {
            blob_object_id: blob_object_id.into(),
            ..Default::default()
        }
    }

    pub fn with_trigger(mut self, trigger_source: impl Into<String>) -> Self {
        self.trigger_source = Some(trigger_source.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }
}

/// Outcome of one `process_batch` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchSummary {
    /// Items confirmed deleted (or already absent) this run.
    pub processed: u64,
    /// Items that failed and were recorded for retry.
    pub failed: u64,
    /// Pending rows left in the queue after this run.
    pub pending_remaining: u64,
}

/// Per-status row counts for dashboards and health checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            CleanupStatus::Pending,
            CleanupStatus::Processing,
            CleanupStatus::Completed,
            CleanupStatus::Failed,
        ] {
            assert_eq!(CleanupStatus::from_str(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = CleanupStatus::from_str("archived").unwrap_err();
        assert_eq!(err, ParseStatusError("archived".into()));
    }

    #[test]
    fn poison_detection_requires_failed_status() {
        let item = CleanupQueueItem {
            id: CleanupItemId(1),
            blob_object_id: "obj".into(),
            original_filename: None,
            status: CleanupStatus::Completed,
            trigger_source: None,
            error_message: None,
            retry_count: 5,
            created_at: Utc::now(),
            deleted_at: None,
            processed_at: None,
        };
        assert!(!item.is_poison(3));

        let failed = CleanupQueueItem {
            status: CleanupStatus::Failed,
            ..item
        };
        assert!(failed.is_poison(3));
        assert!(!failed.is_poison(6));
    }
}
