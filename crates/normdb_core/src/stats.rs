//! Database statistics.
//!
//! Counters for commits, entity churn, index cleanup and the getter cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! let db = Database::<Library>::new();
//! db.perform_batch_updates(|ctx| { ctx.insert_or_update(author); Ok(()) })?;
//!
//! let stats = db.stats().snapshot();
//! println!("Commits: {}", stats.transactions_committed);
//! println!("Inserted: {}", stats.entities_inserted);
//! ```

use crate::storage::ChangeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Database statistics and metrics.
///
/// All counters are atomic and can be read while transactions are in
/// progress. Values only grow. A disabled instance ignores every record
/// call and always reads zero.
#[derive(Debug)]
pub struct DatabaseStats {
    enabled: bool,

    // Transaction counters
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_aborted: AtomicU64,
    /// Commits that changed nothing and published no snapshot.
    empty_commits: AtomicU64,

    // Entity counters
    entities_inserted: AtomicU64,
    entities_updated: AtomicU64,
    entities_deleted: AtomicU64,

    /// Number of index cleanups that removed at least one identity.
    index_cleanups: AtomicU64,

    // Getter cache counters
    getter_cache_hits: AtomicU64,
    getter_cache_misses: AtomicU64,
    getter_cache_evictions: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Creates a stats instance that records nothing.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            transactions_started: AtomicU64::new(0),
            transactions_committed: AtomicU64::new(0),
            transactions_aborted: AtomicU64::new(0),
            empty_commits: AtomicU64::new(0),
            entities_inserted: AtomicU64::new(0),
            entities_updated: AtomicU64::new(0),
            entities_deleted: AtomicU64::new(0),
            index_cleanups: AtomicU64::new(0),
            getter_cache_hits: AtomicU64::new(0),
            getter_cache_misses: AtomicU64::new(0),
            getter_cache_evictions: AtomicU64::new(0),
        }
    }

    /// Returns true if this instance records anything.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn bump(&self, counter: &AtomicU64, by: u64) {
        if self.enabled {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_transaction_start(&self) {
        self.bump(&self.transactions_started, 1);
    }

    /// Records a commit and the entity churn of its change-set.
    pub(crate) fn record_transaction_commit(&self, changes: &ChangeSet) {
        self.bump(&self.transactions_committed, 1);
        if changes.is_empty() {
            self.bump(&self.empty_commits, 1);
        }
        self.bump(&self.entities_inserted, changes.inserted_count() as u64);
        self.bump(&self.entities_updated, changes.updated_count() as u64);
        self.bump(&self.entities_deleted, changes.deleted_count() as u64);
    }

    pub(crate) fn record_transaction_abort(&self) {
        self.bump(&self.transactions_aborted, 1);
    }

    pub(crate) fn record_index_cleanup(&self) {
        self.bump(&self.index_cleanups, 1);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.bump(&self.getter_cache_hits, 1);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.bump(&self.getter_cache_misses, 1);
    }

    pub(crate) fn record_cache_eviction(&self) {
        self.bump(&self.getter_cache_evictions, 1);
    }

    // === Getter methods (public API) ===

    /// Returns the total number of transactions started.
    pub fn transactions_started(&self) -> u64 {
        self.transactions_started.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions committed.
    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions aborted.
    pub fn transactions_aborted(&self) -> u64 {
        self.transactions_aborted.load(Ordering::Relaxed)
    }

    /// Returns the number of commits that changed nothing.
    pub fn empty_commits(&self) -> u64 {
        self.empty_commits.load(Ordering::Relaxed)
    }

    /// Returns the total number of inserted entities.
    pub fn entities_inserted(&self) -> u64 {
        self.entities_inserted.load(Ordering::Relaxed)
    }

    /// Returns the total number of updated entities.
    pub fn entities_updated(&self) -> u64 {
        self.entities_updated.load(Ordering::Relaxed)
    }

    /// Returns the total number of deleted entities.
    pub fn entities_deleted(&self) -> u64 {
        self.entities_deleted.load(Ordering::Relaxed)
    }

    /// Returns the number of index cleanups that removed identities.
    pub fn index_cleanups(&self) -> u64 {
        self.index_cleanups.load(Ordering::Relaxed)
    }

    /// Returns the total number of getter cache hits.
    pub fn getter_cache_hits(&self) -> u64 {
        self.getter_cache_hits.load(Ordering::Relaxed)
    }

    /// Returns the total number of getter cache misses.
    pub fn getter_cache_misses(&self) -> u64 {
        self.getter_cache_misses.load(Ordering::Relaxed)
    }

    /// Returns the total number of getter cache evictions.
    pub fn getter_cache_evictions(&self) -> u64 {
        self.getter_cache_evictions.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_started: self.transactions_started(),
            transactions_committed: self.transactions_committed(),
            transactions_aborted: self.transactions_aborted(),
            empty_commits: self.empty_commits(),
            entities_inserted: self.entities_inserted(),
            entities_updated: self.entities_updated(),
            entities_deleted: self.entities_deleted(),
            index_cleanups: self.index_cleanups(),
            getter_cache_hits: self.getter_cache_hits(),
            getter_cache_misses: self.getter_cache_misses(),
            getter_cache_evictions: self.getter_cache_evictions(),
        }
    }
}

impl Default for DatabaseStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of database statistics.
///
/// Unlike `DatabaseStats`, this is a simple struct that can be serialized,
/// compared, or passed across threads without atomics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// Total number of transactions started.
    pub transactions_started: u64,
    /// Total number of transactions committed.
    pub transactions_committed: u64,
    /// Total number of transactions aborted.
    pub transactions_aborted: u64,
    /// Commits that changed nothing.
    pub empty_commits: u64,
    /// Total number of inserted entities.
    pub entities_inserted: u64,
    /// Total number of updated entities.
    pub entities_updated: u64,
    /// Total number of deleted entities.
    pub entities_deleted: u64,
    /// Index cleanups that removed identities.
    pub index_cleanups: u64,
    /// Getter cache hits.
    pub getter_cache_hits: u64,
    /// Getter cache misses.
    pub getter_cache_misses: u64,
    /// Getter cache evictions.
    pub getter_cache_evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = DatabaseStats::new();
        assert!(stats.is_enabled());
        assert_eq!(stats.transactions_started(), 0);
        assert_eq!(stats.entities_inserted(), 0);
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_transactions() {
        let stats = DatabaseStats::new();

        stats.record_transaction_start();
        stats.record_transaction_start();
        stats.record_transaction_commit(&ChangeSet::default());
        stats.record_transaction_abort();

        assert_eq!(stats.transactions_started(), 2);
        assert_eq!(stats.transactions_committed(), 1);
        assert_eq!(stats.empty_commits(), 1);
        assert_eq!(stats.transactions_aborted(), 1);
    }

    #[test]
    fn disabled_stats_record_nothing() {
        let stats = DatabaseStats::disabled();
        stats.record_transaction_start();
        stats.record_cache_hit();
        stats.record_index_cleanup();

        assert!(!stats.is_enabled());
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot() {
        let stats = DatabaseStats::new();
        stats.record_cache_hit();
        stats.record_cache_miss();
        stats.record_cache_miss();
        stats.record_cache_eviction();

        let snap = stats.snapshot();
        assert_eq!(snap.getter_cache_hits, 1);
        assert_eq!(snap.getter_cache_misses, 2);
        assert_eq!(snap.getter_cache_evictions, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_serializes_as_json() {
        let stats = DatabaseStats::new();
        stats.record_transaction_start();

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"transactions_started\":1"));
        let back: StatsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats.snapshot());
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_cache_hit();
                    s.record_transaction_start();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.getter_cache_hits(), 1000);
        assert_eq!(stats.transactions_started(), 1000);
    }
}
