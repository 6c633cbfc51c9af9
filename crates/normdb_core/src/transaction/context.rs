//! Batch context handed to transaction blocks.

use crate::entity::{EntityTable, InsertionResult};
use crate::error::{CoreError, CoreResult};
use crate::index::{GroupedIndex, GroupedIndexDef, OrderedIndex, OrderedIndexDef};
use crate::schema::{Schema, StoredIn};
use crate::storage::BackingStorage;
use crate::types::TransactionId;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::Arc;

/// Mutable view of one in-flight batch transaction.
///
/// Writes go to a staged copy of the committed storage. Reads through the
/// context see the batch's own writes; [`committed`](Self::committed) still
/// shows the state the batch started from. Nothing is visible to other
/// readers until the block returns `Ok`.
pub struct BatchContext<'a, S: Schema> {
    id: TransactionId,
    committed: &'a BackingStorage<S>,
    staged: BackingStorage<S>,
}

impl<'a, S: Schema> BatchContext<'a, S> {
    pub(crate) fn new(id: TransactionId, committed: &'a BackingStorage<S>) -> Self {
        Self {
            id,
            committed,
            staged: committed.clone(),
        }
    }

    pub(crate) fn into_staged(self) -> BackingStorage<S> {
        self.staged
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the committed storage this batch started from.
    #[must_use]
    pub fn committed(&self) -> &BackingStorage<S> {
        self.committed
    }

    /// Returns the staged storage, including this batch's writes.
    #[must_use]
    pub fn staged(&self) -> &BackingStorage<S> {
        &self.staged
    }

    /// Builds the error that aborts the batch when returned from the block.
    ///
    /// ```rust,ignore
    /// db.perform_batch_updates(|ctx| {
    ///     if ctx.table::<Book>().len() > 100 {
    ///         return Err(ctx.abort("library is full"));
    ///     }
    ///     Ok(())
    /// })?;
    /// ```
    #[must_use]
    pub fn abort(&self, reason: impl Into<String>) -> CoreError {
        CoreError::transaction_aborted(reason)
    }

    /// Returns the staged table of `E`.
    pub fn table<E: StoredIn<S>>(&self) -> Cow<'_, EntityTable<E>> {
        self.staged.table::<E>()
    }

    /// Finds one entity in the staged state.
    #[must_use]
    pub fn find<E: StoredIn<S>>(&self, id: &E::Id) -> Option<Arc<E>> {
        self.staged.find::<E>(id)
    }

    /// Returns the staged table of `E` for writing.
    pub fn table_mut<E: StoredIn<S>>(&mut self) -> &mut EntityTable<E> {
        self.staged.table_mut::<E>()
    }

    /// Inserts an entity, replacing any value stored under the same identity.
    pub fn insert_or_update<E: StoredIn<S>>(&mut self, entity: E) -> InsertionResult<E> {
        self.table_mut::<E>().insert_or_update(entity)
    }

    /// Inserts or updates every entity of the sequence, in order.
    pub fn insert_or_update_all<E, I>(&mut self, entities: I) -> Vec<InsertionResult<E>>
    where
        E: StoredIn<S>,
        I: IntoIterator<Item = E>,
    {
        self.table_mut::<E>().insert_or_update_all(entities)
    }

    /// Mutates an existing entity; absence is not an error.
    pub fn update_if_exists<E, F>(&mut self, id: &E::Id, mutator: F) -> Option<Arc<E>>
    where
        E: StoredIn<S>,
        F: FnOnce(&mut E),
    {
        self.table_mut::<E>().update_if_exists(id, mutator)
    }

    /// Mutates an existing entity, failing with
    /// [`CoreError::EntityNotFound`] when it is absent.
    pub fn update<E, F>(&mut self, id: &E::Id, mutator: F) -> CoreResult<Arc<E>>
    where
        E: StoredIn<S>,
        F: FnOnce(&mut E),
    {
        self.table_mut::<E>().update(id, mutator)
    }

    /// Removes one entity.
    pub fn remove<E: StoredIn<S>>(&mut self, id: &E::Id) -> Option<Arc<E>> {
        self.table_mut::<E>().remove(id)
    }

    /// Removes every entity whose identity is in `ids`.
    pub fn remove_all<E, I>(&mut self, ids: I) -> usize
    where
        E: StoredIn<S>,
        I: IntoIterator,
        I::Item: Borrow<E::Id>,
    {
        self.table_mut::<E>().remove_all(ids)
    }

    /// Returns the staged ordered index named by `I`.
    pub fn ordered_index<I>(&self) -> Cow<'_, OrderedIndex<I::Member>>
    where
        I: OrderedIndexDef<Schema = S>,
    {
        self.staged.ordered_index::<I>()
    }

    /// Returns the staged ordered index named by `I` for writing.
    pub fn ordered_index_mut<I>(&mut self) -> &mut OrderedIndex<I::Member>
    where
        I: OrderedIndexDef<Schema = S>,
    {
        self.staged.ordered_index_mut::<I>()
    }

    /// Returns the staged grouped index named by `I`.
    pub fn grouped_index<I>(&self) -> Cow<'_, GroupedIndex<I::Group, I::Member>>
    where
        I: GroupedIndexDef<Schema = S>,
    {
        self.staged.grouped_index::<I>()
    }

    /// Returns the staged grouped index named by `I` for writing.
    pub fn grouped_index_mut<I>(&mut self) -> &mut GroupedIndex<I::Group, I::Member>
    where
        I: GroupedIndexDef<Schema = S>,
    {
        self.staged.grouped_index_mut::<I>()
    }
}

impl<S: Schema> fmt::Debug for BatchContext<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchContext")
            .field("id", &self.id)
            .field("staged", &self.staged)
            .finish_non_exhaustive()
    }
}
