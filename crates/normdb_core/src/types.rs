//! Core type definitions for normdb.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide logical clock shared by every container.
static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a batch transaction.
///
/// Transaction IDs are monotonically increasing per container and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Logical modification timestamp.
///
/// Timestamps are ticks of a process-wide counter rather than wall-clock
/// time. Every call to [`Timestamp::tick`] returns a value strictly greater
/// than any previously issued one, so two snapshots carrying the same
/// timestamp were produced by the same commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The timestamp of storage that has never been written.
    pub const ZERO: Self = Self(0);

    /// Issues a fresh timestamp.
    #[must_use]
    pub fn tick() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_ordering() {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        assert!(t1 < t2);
        assert_eq!(format!("{t2}"), "txn:2");
    }

    #[test]
    fn ticks_strictly_increase() {
        let a = Timestamp::tick();
        let b = Timestamp::tick();
        assert!(b > a);
        assert!(a > Timestamp::ZERO);
    }

    #[test]
    fn ticks_unique_across_threads() {
        use std::collections::HashSet;
        use std::thread;

        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| (0..100).map(|_| Timestamp::tick()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for ts in h.join().unwrap() {
                assert!(seen.insert(ts));
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
