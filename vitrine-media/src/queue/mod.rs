//! Durable storage for cleanup intents.
//!
//! The repository owns every state transition; nothing outside this module
//! mutates queue rows. Each transition requires the row to currently be in a
//! specific source state, which is what makes concurrent workers safe.

mod memory;
mod ports;
#[cfg(feature = "database")]
mod postgres;

pub use memory::InMemoryCleanupQueueRepository;
pub use ports::CleanupQueueRepository;
#[cfg(feature = "database")]
pub use postgres::PostgresCleanupQueueRepository;
