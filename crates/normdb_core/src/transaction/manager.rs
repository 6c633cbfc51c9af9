//! Transaction manager.

use crate::error::CoreResult;
use crate::schema::Schema;
use crate::stats::DatabaseStats;
use crate::storage::{unique_index, unique_table, BackingStorage, ChangeSet, RemovalSet};
use crate::transaction::BatchContext;
use crate::types::{Timestamp, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// The outcome of a committed batch.
pub struct Commit<S: Schema, R> {
    /// Transaction ID.
    pub id: TransactionId,
    /// Value returned by the transaction block.
    pub value: R,
    /// Committed storage after the batch.
    ///
    /// The same `Arc` as before the batch when nothing changed.
    pub snapshot: Arc<BackingStorage<S>>,
    /// What the batch changed.
    pub changes: ChangeSet,
}

impl<S: Schema, R: fmt::Debug> fmt::Debug for Commit<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("id", &self.id)
            .field("value", &self.value)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

/// Runs batch transactions against one committed storage.
///
/// ## Single-Writer Guarantee
///
/// Batches are serialized by an exclusive write lock held from the moment
/// the block starts until the new storage is published. Readers never take
/// that lock: [`snapshot`](Self::snapshot) clones the current `Arc` and is
/// never blocked by a running batch.
///
/// ## Commit pipeline
///
/// 1. run the block against a staged copy;
/// 2. diff every table whose slot the block touched;
/// 3. collect deleted identities into a [`RemovalSet`];
/// 4. hand the removal set to every affected index, in declaration order;
/// 5. stamp changed tables and advance the storage timestamps;
/// 6. publish the staged copy.
///
/// A block that returns `Err` (or panics) discards the staged copy; the
/// committed storage is left exactly as it was.
pub struct TransactionManager<S: Schema> {
    /// Current committed storage.
    committed: RwLock<Arc<BackingStorage<S>>>,
    /// Next transaction ID.
    next_txid: AtomicU64,
    /// Write lock - only one batch at a time.
    write_lock: Mutex<()>,
    stats: Arc<DatabaseStats>,
}

impl<S: Schema> TransactionManager<S> {
    /// Creates a manager over `storage`.
    pub fn new(storage: BackingStorage<S>, stats: Arc<DatabaseStats>) -> Self {
        Self {
            committed: RwLock::new(Arc::new(storage)),
            next_txid: AtomicU64::new(1),
            write_lock: Mutex::new(()),
            stats,
        }
    }

    /// Returns the current committed storage.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BackingStorage<S>> {
        Arc::clone(&self.committed.read())
    }

    /// Runs `block` as one atomic batch.
    pub fn run<R, F>(&self, block: F) -> CoreResult<Commit<S, R>>
    where
        F: FnOnce(&mut BatchContext<'_, S>) -> CoreResult<R>,
    {
        let _write_guard = self.write_lock.lock();

        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let before = self.snapshot();
        self.stats.record_transaction_start();
        trace!(txn = %id, "batch started");

        let mut ctx = BatchContext::new(id, &before);
        let value = match block(&mut ctx) {
            Ok(value) => value,
            Err(err) => {
                self.stats.record_transaction_abort();
                debug!(txn = %id, error = %err, "batch aborted, staged changes discarded");
                return Err(err);
            }
        };

        let mut staged = ctx.into_staged();
        let changes = self.finalize(&before, &mut staged);
        self.stats.record_transaction_commit(&changes);

        if changes.is_empty() {
            trace!(txn = %id, "batch changed nothing");
            return Ok(Commit {
                id,
                value,
                snapshot: before,
                changes,
            });
        }

        let snapshot = Arc::new(staged);
        *self.committed.write() = Arc::clone(&snapshot);

        debug!(
            txn = %id,
            inserted = changes.inserted_count(),
            updated = changes.updated_count(),
            deleted = changes.deleted_count(),
            index_changed = changes.index_changed(),
            "batch committed"
        );

        Ok(Commit {
            id,
            value,
            snapshot,
            changes,
        })
    }

    /// Derives the change-set, cleans indices and stamps timestamps.
    ///
    /// Slots whose content ends up structurally equal to the committed one
    /// are reset to the committed `Arc`, so readers keep seeing the same
    /// allocations.
    fn finalize(&self, before: &BackingStorage<S>, staged: &mut BackingStorage<S>) -> ChangeSet {
        let table_keys: Vec<TypeId> = staged.table_order().iter().map(|(key, _)| *key).collect();
        let mut tables = Vec::new();
        let mut changed_tables = Vec::new();
        let mut removal = RemovalSet::new();

        for key in table_keys {
            let prev = before.table_slot(&key).cloned();
            let Some(slot) = staged.table_slot_mut(&key) else {
                continue;
            };
            if prev.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, slot)) {
                continue;
            }

            if let Some(ids) = unique_table(slot).take_removed() {
                removal.insert_erased(key, ids);
            }
            match slot.diff_against(prev.as_deref()) {
                Some(change) => {
                    tables.push(change);
                    changed_tables.push(key);
                }
                None => {
                    if let Some(prev) = prev {
                        *slot = prev;
                    }
                }
            }
        }

        if !removal.is_empty() {
            let index_keys: Vec<(TypeId, &'static str)> = staged.index_order().to_vec();
            for (key, name) in index_keys {
                let Some(slot) = staged.index_slot_mut(&key) else {
                    continue;
                };
                if slot.affected_by(&removal) && unique_index(slot).apply_removal(&removal) {
                    self.stats.record_index_cleanup();
                    trace!(index = name, "pruned removed identities");
                }
            }
        }

        let mut index_changed = false;
        let index_keys: Vec<TypeId> = staged.index_order().iter().map(|(key, _)| *key).collect();
        for key in index_keys {
            let prev = before.index_slot(&key).cloned();
            let Some(slot) = staged.index_slot_mut(&key) else {
                continue;
            };
            match prev {
                Some(prev) if Arc::ptr_eq(&prev, slot) => {}
                Some(prev) if slot.same_as(&*prev) => *slot = prev,
                Some(_) => index_changed = true,
                None => index_changed |= !slot.is_empty(),
            }
        }

        let entities_changed = !tables.is_empty();
        if entities_changed || index_changed {
            let ts = Timestamp::tick();
            if entities_changed {
                for key in &changed_tables {
                    if let Some(slot) = staged.table_slot_mut(key) {
                        unique_table(slot).stamp(ts);
                    }
                }
                staged.set_entity_updated_at(ts);
            }
            if index_changed {
                staged.set_index_updated_at(ts);
            }
        }

        ChangeSet::new(tables, index_changed)
    }
}

impl<S: Schema> fmt::Debug for TransactionManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("next_txid", &self.next_txid.load(Ordering::Relaxed))
            .field("committed", &self.committed.read())
            .finish_non_exhaustive()
    }
}
