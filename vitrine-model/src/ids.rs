#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Strongly typed ID for cleanup queue rows.
///
/// Assigned monotonically by the queue store (BIGSERIAL in Postgres), so it
/// doubles as a coarse ordering key for audit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CleanupItemId(pub i64);

impl CleanupItemId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CleanupItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CleanupItemId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
