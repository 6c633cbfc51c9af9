//! Transaction change-sets.

use crate::entity::{Entity, TableDiff};
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;

/// Changes to one table produced by a commit.
pub struct TableChange {
    key: TypeId,
    name: &'static str,
    inserted: usize,
    updated: usize,
    deleted: usize,
    diff: Box<dyn Any + Send + Sync>,
}

impl TableChange {
    pub(crate) fn new<E: Entity>(diff: TableDiff<E::Id>) -> Self {
        Self {
            key: TypeId::of::<E>(),
            name: E::table_name(),
            inserted: diff.inserted.len(),
            updated: diff.updated.len(),
            deleted: diff.deleted.len(),
            diff: Box::new(diff),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of inserted entities.
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.inserted
    }

    /// Returns the number of updated entities.
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.updated
    }

    /// Returns the number of deleted entities.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted
    }

    fn typed<E: Entity>(&self) -> Option<&TableDiff<E::Id>> {
        if self.key != TypeId::of::<E>() {
            return None;
        }
        self.diff.downcast_ref()
    }
}

impl fmt::Debug for TableChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableChange")
            .field("name", &self.name)
            .field("inserted", &self.inserted)
            .field("updated", &self.updated)
            .field("deleted", &self.deleted)
            .finish()
    }
}

/// Inserted, updated and deleted identities of one commit, per table.
///
/// Only tables with at least one change are listed, in declaration order.
#[derive(Debug, Default)]
pub struct ChangeSet {
    tables: Vec<TableChange>,
    index_changed: bool,
}

impl ChangeSet {
    pub(crate) fn new(tables: Vec<TableChange>, index_changed: bool) -> Self {
        Self {
            tables,
            index_changed,
        }
    }

    /// Returns true if no table and no index changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && !self.index_changed
    }

    /// Returns true if at least one entity was written or removed.
    #[must_use]
    pub fn entities_changed(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Returns true if at least one index changed.
    #[must_use]
    pub fn index_changed(&self) -> bool {
        self.index_changed
    }

    /// Returns the per-table changes in declaration order.
    #[must_use]
    pub fn tables(&self) -> &[TableChange] {
        &self.tables
    }

    /// Returns true if the table of `E` changed.
    #[must_use]
    pub fn touches<E: Entity>(&self) -> bool {
        self.find::<E>().is_some()
    }

    /// Returns identities inserted into the table of `E`.
    #[must_use]
    pub fn inserted<E: Entity>(&self) -> Option<&HashSet<E::Id>> {
        self.find::<E>().map(|diff| &diff.inserted)
    }

    /// Returns identities whose value changed in the table of `E`.
    #[must_use]
    pub fn updated<E: Entity>(&self) -> Option<&HashSet<E::Id>> {
        self.find::<E>().map(|diff| &diff.updated)
    }

    /// Returns identities deleted from the table of `E`.
    #[must_use]
    pub fn deleted<E: Entity>(&self) -> Option<&HashSet<E::Id>> {
        self.find::<E>().map(|diff| &diff.deleted)
    }

    /// Returns the total number of inserted entities.
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.tables.iter().map(TableChange::inserted_count).sum()
    }

    /// Returns the total number of updated entities.
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.tables.iter().map(TableChange::updated_count).sum()
    }

    /// Returns the total number of deleted entities.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.tables.iter().map(TableChange::deleted_count).sum()
    }

    fn find<E: Entity>(&self) -> Option<&TableDiff<E::Id>> {
        self.tables.iter().find_map(TableChange::typed::<E>)
    }
}
