//! Type-erased table and index slots.
//!
//! The backing storage holds heterogeneous tables and indices keyed by
//! `TypeId`. Each slot is an `Arc` shared with every snapshot that has not
//! written to it; writers clone the slot on first mutation.

use crate::entity::{Entity, EntityTable};
use crate::index::{GroupedIndex, OrderedIndex};
use crate::storage::changes::TableChange;
use crate::storage::RemovalSet;
use crate::types::Timestamp;
use std::any::Any;
use std::sync::Arc;

pub(crate) trait AnyTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_table(&self) -> Arc<dyn AnyTable>;
    fn len(&self) -> usize;
    fn updated_at(&self) -> Timestamp;
    fn stamp(&mut self, ts: Timestamp);
    /// Diffs against `before`; `None` stands for a table that did not exist.
    fn diff_against(&self, before: Option<&dyn AnyTable>) -> Option<TableChange>;
    /// Drains the removal log as a `HashSet<E::Id>` of identities still absent.
    fn take_removed(&mut self) -> Option<Box<dyn Any + Send + Sync>>;
}

impl<E: Entity> AnyTable for EntityTable<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_table(&self) -> Arc<dyn AnyTable> {
        Arc::new(self.clone())
    }

    fn len(&self) -> usize {
        EntityTable::len(self)
    }

    fn updated_at(&self) -> Timestamp {
        EntityTable::updated_at(self)
    }

    fn stamp(&mut self, ts: Timestamp) {
        self.set_updated_at(ts);
    }

    fn diff_against(&self, before: Option<&dyn AnyTable>) -> Option<TableChange> {
        let empty = EntityTable::<E>::new();
        let before = before
            .and_then(|table| table.as_any().downcast_ref::<EntityTable<E>>())
            .unwrap_or(&empty);

        let diff = self.diff(before);
        (!diff.is_empty()).then(|| TableChange::new::<E>(diff))
    }

    fn take_removed(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        let ids = EntityTable::take_removed(self);
        (!ids.is_empty()).then(|| Box::new(ids) as Box<dyn Any + Send + Sync>)
    }
}

pub(crate) trait AnyIndex: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_index(&self) -> Arc<dyn AnyIndex>;
    fn is_empty(&self) -> bool;
    fn affected_by(&self, removal: &RemovalSet) -> bool;
    fn apply_removal(&mut self, removal: &RemovalSet) -> bool;
    /// Structural equality with another slot of the same key.
    fn same_as(&self, other: &dyn AnyIndex) -> bool;
}

impl<E: Entity> AnyIndex for OrderedIndex<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_index(&self) -> Arc<dyn AnyIndex> {
        Arc::new(self.clone())
    }

    fn is_empty(&self) -> bool {
        OrderedIndex::is_empty(self)
    }

    fn affected_by(&self, removal: &RemovalSet) -> bool {
        self.is_affected_by(removal)
    }

    fn apply_removal(&mut self, removal: &RemovalSet) -> bool {
        OrderedIndex::apply_removal(self, removal)
    }

    fn same_as(&self, other: &dyn AnyIndex) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other == self)
    }
}

impl<G: Entity, M: Entity> AnyIndex for GroupedIndex<G, M> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_index(&self) -> Arc<dyn AnyIndex> {
        Arc::new(self.clone())
    }

    fn is_empty(&self) -> bool {
        GroupedIndex::is_empty(self)
    }

    fn affected_by(&self, removal: &RemovalSet) -> bool {
        self.is_affected_by(removal)
    }

    fn apply_removal(&mut self, removal: &RemovalSet) -> bool {
        GroupedIndex::apply_removal(self, removal)
    }

    fn same_as(&self, other: &dyn AnyIndex) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other == self)
    }
}

/// Makes `slot` uniquely owned, cloning it if a snapshot still shares it.
pub(crate) fn unique_table(slot: &mut Arc<dyn AnyTable>) -> &mut dyn AnyTable {
    if Arc::get_mut(slot).is_none() {
        *slot = slot.clone_table();
    }
    Arc::get_mut(slot).expect("freshly cloned table slot is unique")
}

/// Makes `slot` uniquely owned, cloning it if a snapshot still shares it.
pub(crate) fn unique_index(slot: &mut Arc<dyn AnyIndex>) -> &mut dyn AnyIndex {
    if Arc::get_mut(slot).is_none() {
        *slot = slot.clone_index();
    }
    Arc::get_mut(slot).expect("freshly cloned index slot is unique")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u32,
        text: &'static str,
    }

    impl Entity for Note {
        type Id = u32;

        fn entity_id(&self) -> u32 {
            self.id
        }
    }

    #[test]
    fn unique_table_clones_only_when_shared() {
        let mut table = EntityTable::<Note>::new();
        table.insert_or_update(Note { id: 1, text: "a" });
        let mut slot: Arc<dyn AnyTable> = Arc::new(table);

        let snapshot = Arc::clone(&slot);
        unique_table(&mut slot)
            .as_any_mut()
            .downcast_mut::<EntityTable<Note>>()
            .unwrap()
            .insert_or_update(Note { id: 2, text: "b" });

        assert!(!Arc::ptr_eq(&slot, &snapshot));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(slot.len(), 2);

        drop(snapshot);
        let before = Arc::as_ptr(&slot) as *const ();
        unique_table(&mut slot);
        assert_eq!(Arc::as_ptr(&slot) as *const (), before);
    }

    #[test]
    fn diff_against_missing_table_reports_inserts() {
        let mut table = EntityTable::<Note>::new();
        table.insert_or_update(Note { id: 1, text: "a" });

        let change = table.diff_against(None).unwrap();
        assert_eq!(change.inserted_count(), 1);
        assert!(AnyTable::take_removed(&mut table).is_none());
    }

    #[test]
    fn take_removed_hands_out_typed_identities() {
        let mut table = EntityTable::<Note>::new();
        table.insert_or_update(Note { id: 1, text: "a" });
        table.insert_or_update(Note { id: 2, text: "b" });
        table.remove(&1);

        let ids = AnyTable::take_removed(&mut table).unwrap();
        assert_eq!(
            ids.downcast_ref::<HashSet<u32>>(),
            Some(&HashSet::from([1]))
        );
        assert!(AnyTable::take_removed(&mut table).is_none());
    }

    #[test]
    fn index_same_as_compares_structure() {
        let a: OrderedIndex<Note> = [1, 2].into_iter().collect();
        let b: OrderedIndex<Note> = [1, 2].into_iter().collect();
        let c: OrderedIndex<Note> = [2, 1].into_iter().collect();

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }
}
