//! Media blob cleanup reconciliation queue for the Vitrine platform.
//!
//! Keeps the media catalog and the remote blob-storage provider consistent
//! when catalog records are deleted through paths that do not themselves
//! call the blob store (direct catalog deletes, admin bulk operations,
//! cascading deletes). Catalog delete paths enqueue an intent row; the
//! [`worker::CleanupWorker`] drains those rows against the provider with
//! at-least-once semantics, and the maintenance tasks in [`maintenance`]
//! re-arm transient failures, sweep orphaned claims, and bound storage
//! growth.
//!
//! The queue store is the sole shared mutable resource. All mutations go
//! through [`queue::CleanupQueueRepository`], whose conditional
//! `pending -> processing` claim is the correctness boundary under
//! horizontally scaled workers.

pub mod blob;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod queue;
pub mod stats;
pub mod worker;

pub use blob::{BlobStore, DeleteOutcome, HttpBlobStore};
pub use config::CleanupQueueConfig;
pub use error::{CleanupError, Result};
pub use maintenance::{GarbageCollector, RetryScheduler};
pub use queue::{CleanupQueueRepository, InMemoryCleanupQueueRepository};
#[cfg(feature = "database")]
pub use queue::PostgresCleanupQueueRepository;
pub use stats::StatsReporter;
pub use worker::CleanupWorker;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
