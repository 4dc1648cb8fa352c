//! Core data model definitions shared across Vitrine crates.

pub mod cleanup;
pub mod ids;

// Intentionally curated re-exports for downstream consumers.
pub use cleanup::{
    BatchSummary, CleanupQueueItem, CleanupStatus, NewCleanupItem,
    ParseStatusError, QueueStats,
};
pub use ids::CleanupItemId;
