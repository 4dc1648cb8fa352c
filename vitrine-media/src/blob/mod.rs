//! Adapter boundary to the remote blob-storage provider.
//!
//! The worker only ever issues deletes through [`BlobStore`]; everything the
//! provider reports is folded into the tagged [`DeleteOutcome`] so callers
//! never classify by error text.

mod http;

pub use http::HttpBlobStore;

use async_trait::async_trait;

use crate::error::Result;

/// Result of one delete call against the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object existed and was removed.
    Deleted,
    /// The object was already absent. Counts as success: the cleanup goal
    /// ("this blob must not exist") is satisfied, and duplicate queue rows
    /// for the same object stay harmless.
    NotFound,
    /// Transient provider or network condition; the row should be retried.
    Retriable(String),
    /// The provider rejected the request in a way a retry will not fix
    /// (bad credentials, malformed object id).
    Permanent(String),
}

impl DeleteOutcome {
    /// Whether the cleanup obligation for the blob is discharged.
    pub fn is_success(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted | DeleteOutcome::NotFound)
    }
}

/// Remote blob-deletion API consumed by the cleanup worker.
///
/// Implementations must be idempotent: deleting the same `blob_object_id`
/// twice reports `NotFound` on the second call rather than erroring.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn delete(&self, blob_object_id: &str) -> Result<DeleteOutcome>;
}
