//! Backing storage.
//!
//! [`BackingStorage`] is one immutable-by-convention snapshot of every table
//! and index of a schema. Snapshots share untouched tables and indices, so
//! cloning one is O(tables + indices) and a commit only copies what it
//! writes.

mod changes;
mod erased;
mod removal;

pub use changes::{ChangeSet, TableChange};
pub use removal::RemovalSet;

pub(crate) use erased::{unique_index, unique_table, AnyIndex, AnyTable};

use crate::entity::{Entity, EntityTable};
use crate::index::{GroupedIndex, GroupedIndexDef, OrderedIndex, OrderedIndexDef};
use crate::schema::{Schema, SchemaDecl, StoredIn};
use crate::types::Timestamp;
use std::any::TypeId;
use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Slot key of the ordered index defined by `I`.
///
/// Index keys pair the marker with its container type, so one marker can
/// define both an ordered and a grouped index without the slots colliding.
pub(crate) fn ordered_key<I: OrderedIndexDef>() -> TypeId {
    TypeId::of::<(I, OrderedIndex<I::Member>)>()
}

/// Slot key of the grouped index defined by `I`.
pub(crate) fn grouped_key<I: GroupedIndexDef>() -> TypeId {
    TypeId::of::<(I, GroupedIndex<I::Group, I::Member>)>()
}

/// Every table and index of schema `S`, plus two commit timestamps.
///
/// `entity_updated_at` advances on commits that change any table;
/// `index_updated_at` advances on commits that change any index. Both are
/// strictly increasing across the process.
///
/// Reads of tables or indices never written return an empty value.
pub struct BackingStorage<S: Schema> {
    tables: HashMap<TypeId, Arc<dyn AnyTable>>,
    table_order: Vec<(TypeId, &'static str)>,
    indexes: HashMap<TypeId, Arc<dyn AnyIndex>>,
    index_order: Vec<(TypeId, &'static str)>,
    entity_updated_at: Timestamp,
    index_updated_at: Timestamp,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> BackingStorage<S> {
    /// Creates the empty storage declared by `S`.
    #[must_use]
    pub fn new() -> Self {
        let mut decl = SchemaDecl::new();
        S::declare(&mut decl);
        decl.into_storage()
    }

    pub(crate) fn empty() -> Self {
        Self {
            tables: HashMap::new(),
            table_order: Vec::new(),
            indexes: HashMap::new(),
            index_order: Vec::new(),
            entity_updated_at: Timestamp::ZERO,
            index_updated_at: Timestamp::ZERO,
            _schema: PhantomData,
        }
    }

    pub(crate) fn declare_table<E: Entity>(&mut self, table: EntityTable<E>) {
        let key = TypeId::of::<E>();
        if let Entry::Vacant(slot) = self.tables.entry(key) {
            slot.insert(Arc::new(table));
            self.table_order.push((key, E::table_name()));
        }
    }

    pub(crate) fn declare_index<X: AnyIndex + 'static>(
        &mut self,
        key: TypeId,
        name: &'static str,
        index: X,
    ) {
        if let Entry::Vacant(slot) = self.indexes.entry(key) {
            slot.insert(Arc::new(index));
            self.index_order.push((key, name));
        }
    }

    /// Returns the table of `E`.
    pub fn table<E: StoredIn<S>>(&self) -> Cow<'_, EntityTable<E>> {
        match self.typed_table::<E>() {
            Some(table) => Cow::Borrowed(table),
            None => Cow::Owned(EntityTable::new()),
        }
    }

    /// Finds one entity by identity.
    #[must_use]
    pub fn find<E: StoredIn<S>>(&self, id: &E::Id) -> Option<Arc<E>> {
        self.typed_table::<E>()?.find(id).cloned()
    }

    /// Returns true if an entity of type `E` with this identity is stored.
    #[must_use]
    pub fn contains<E: StoredIn<S>>(&self, id: &E::Id) -> bool {
        self.typed_table::<E>()
            .is_some_and(|table| table.contains(id))
    }

    /// Returns the ordered index named by `I`.
    pub fn ordered_index<I>(&self) -> Cow<'_, OrderedIndex<I::Member>>
    where
        I: OrderedIndexDef<Schema = S>,
    {
        match self.typed_index::<OrderedIndex<I::Member>>(ordered_key::<I>()) {
            Some(index) => Cow::Borrowed(index),
            None => Cow::Owned(OrderedIndex::new()),
        }
    }

    /// Returns the grouped index named by `I`.
    pub fn grouped_index<I>(&self) -> Cow<'_, GroupedIndex<I::Group, I::Member>>
    where
        I: GroupedIndexDef<Schema = S>,
    {
        match self.typed_index::<GroupedIndex<I::Group, I::Member>>(grouped_key::<I>()) {
            Some(index) => Cow::Borrowed(index),
            None => Cow::Owned(GroupedIndex::new()),
        }
    }

    /// Returns the timestamp of the last commit that changed any table.
    #[must_use]
    pub fn entity_updated_at(&self) -> Timestamp {
        self.entity_updated_at
    }

    /// Returns the timestamp of the last commit that changed any index.
    #[must_use]
    pub fn index_updated_at(&self) -> Timestamp {
        self.index_updated_at
    }

    /// Returns the timestamp of the last commit that changed the table of `E`.
    #[must_use]
    pub fn table_updated_at<E: StoredIn<S>>(&self) -> Timestamp {
        self.typed_table::<E>()
            .map_or(Timestamp::ZERO, EntityTable::updated_at)
    }

    /// Returns the number of tables, declared or lazily created.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the number of indices, declared or lazily created.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Returns the number of entities across all tables.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.tables.values().map(|table| table.len()).sum()
    }

    /// Returns table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table_order.iter().map(|(_, name)| *name)
    }

    /// Returns index names in declaration order.
    pub fn index_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.index_order.iter().map(|(_, name)| *name)
    }

    fn typed_table<E: Entity>(&self) -> Option<&EntityTable<E>> {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|table| table.as_any().downcast_ref::<EntityTable<E>>())
    }

    fn typed_index<X: 'static>(&self, key: TypeId) -> Option<&X> {
        self.indexes
            .get(&key)
            .and_then(|index| index.as_any().downcast_ref::<X>())
    }

    // Write path, used by the batch engine on a staged copy.

    pub(crate) fn table_mut<E: Entity>(&mut self) -> &mut EntityTable<E> {
        let key = TypeId::of::<E>();
        let slot = match self.tables.entry(key) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                self.table_order.push((key, E::table_name()));
                slot.insert(Arc::new(EntityTable::<E>::new()))
            }
        };
        unique_table(slot)
            .as_any_mut()
            .downcast_mut::<EntityTable<E>>()
            .expect("table slot holds its own entity type")
    }

    pub(crate) fn ordered_index_mut<I>(&mut self) -> &mut OrderedIndex<I::Member>
    where
        I: OrderedIndexDef<Schema = S>,
    {
        self.index_mut::<OrderedIndex<I::Member>>(ordered_key::<I>(), I::name())
    }

    pub(crate) fn grouped_index_mut<I>(&mut self) -> &mut GroupedIndex<I::Group, I::Member>
    where
        I: GroupedIndexDef<Schema = S>,
    {
        self.index_mut::<GroupedIndex<I::Group, I::Member>>(grouped_key::<I>(), I::name())
    }

    fn index_mut<X: AnyIndex + Default + 'static>(
        &mut self,
        key: TypeId,
        name: &'static str,
    ) -> &mut X {
        let slot = match self.indexes.entry(key) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                self.index_order.push((key, name));
                slot.insert(Arc::new(X::default()))
            }
        };
        unique_index(slot)
            .as_any_mut()
            .downcast_mut::<X>()
            .expect("index slot holds the type declared for its key")
    }

    pub(crate) fn table_order(&self) -> &[(TypeId, &'static str)] {
        &self.table_order
    }

    pub(crate) fn index_order(&self) -> &[(TypeId, &'static str)] {
        &self.index_order
    }

    pub(crate) fn table_slot(&self, key: &TypeId) -> Option<&Arc<dyn AnyTable>> {
        self.tables.get(key)
    }

    pub(crate) fn table_slot_mut(&mut self, key: &TypeId) -> Option<&mut Arc<dyn AnyTable>> {
        self.tables.get_mut(key)
    }

    pub(crate) fn index_slot(&self, key: &TypeId) -> Option<&Arc<dyn AnyIndex>> {
        self.indexes.get(key)
    }

    pub(crate) fn index_slot_mut(&mut self, key: &TypeId) -> Option<&mut Arc<dyn AnyIndex>> {
        self.indexes.get_mut(key)
    }

    pub(crate) fn set_entity_updated_at(&mut self, ts: Timestamp) {
        self.entity_updated_at = ts;
    }

    pub(crate) fn set_index_updated_at(&mut self, ts: Timestamp) {
        self.index_updated_at = ts;
    }
}

impl<S: Schema> Default for BackingStorage<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Clone for BackingStorage<S> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            table_order: self.table_order.clone(),
            indexes: self.indexes.clone(),
            index_order: self.index_order.clone(),
            entity_updated_at: self.entity_updated_at,
            index_updated_at: self.index_updated_at,
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> fmt::Debug for BackingStorage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<_> = self
            .table_order
            .iter()
            .map(|(key, name)| (*name, self.tables.get(key).map_or(0, |t| t.len())))
            .collect();
        f.debug_struct("BackingStorage")
            .field("tables", &tables)
            .field("indexes", &self.index_names().collect::<Vec<_>>())
            .field("entity_updated_at", &self.entity_updated_at)
            .field("index_updated_at", &self.index_updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Planet {
        id: u32,
        name: &'static str,
    }

    impl Entity for Planet {
        type Id = u32;

        fn entity_id(&self) -> u32 {
            self.id
        }

        fn table_name() -> &'static str {
            "planets"
        }
    }

    #[derive(Debug, Clone)]
    struct Moon {
        id: u32,
    }

    impl Entity for Moon {
        type Id = u32;

        fn entity_id(&self) -> u32 {
            self.id
        }
    }

    struct Sky;
    impl StoredIn<Sky> for Planet {}
    impl StoredIn<Sky> for Moon {}

    struct PlanetOrder;
    impl OrderedIndexDef for PlanetOrder {
        type Schema = Sky;
        type Member = Planet;

        fn name() -> &'static str {
            "planet_order"
        }
    }

    struct MoonsByPlanet;
    impl GroupedIndexDef for MoonsByPlanet {
        type Schema = Sky;
        type Group = Planet;
        type Member = Moon;
    }

    struct Orbits;
    impl OrderedIndexDef for Orbits {
        type Schema = Sky;
        type Member = Moon;
    }
    impl GroupedIndexDef for Orbits {
        type Schema = Sky;
        type Group = Planet;
        type Member = Moon;
    }

    impl Schema for Sky {
        fn declare(decl: &mut SchemaDecl<Self>) {
            decl.equatable_table::<Planet>()
                .table::<Planet>()
                .ordered_index::<PlanetOrder>();
        }
    }

    #[test]
    fn declared_layout_and_first_declaration_wins() {
        let storage = BackingStorage::<Sky>::new();
        assert_eq!(storage.table_names().collect::<Vec<_>>(), vec!["planets"]);
        assert_eq!(storage.index_names().collect::<Vec<_>>(), vec!["planet_order"]);
        assert!(storage.table::<Planet>().is_equality_aware());
        assert_eq!(storage.entity_updated_at(), Timestamp::ZERO);
    }

    #[test]
    fn undeclared_reads_are_empty() {
        let storage = BackingStorage::<Sky>::new();
        assert!(storage.table::<Moon>().is_empty());
        assert!(storage.grouped_index::<MoonsByPlanet>().is_empty());
        assert!(storage.find::<Moon>(&1).is_none());
        assert_eq!(storage.table_updated_at::<Moon>(), Timestamp::ZERO);
    }

    #[test]
    fn writes_create_lazily_and_leave_clones_untouched() {
        let original = BackingStorage::<Sky>::new();
        let mut staged = original.clone();

        staged.table_mut::<Moon>().insert_or_update(Moon { id: 7 });
        staged
            .grouped_index_mut::<MoonsByPlanet>()
            .update(1, |moons| moons.push(7));
        staged.table_mut::<Planet>().insert_or_update(Planet {
            id: 1,
            name: "Mars",
        });

        assert_eq!(staged.table_count(), 2);
        assert_eq!(staged.index_count(), 2);
        assert_eq!(staged.entity_count(), 2);
        assert_eq!(staged.grouped_index::<MoonsByPlanet>().members_of(&1), &[7]);
        assert_eq!(staged.find::<Planet>(&1).unwrap().name, "Mars");

        assert_eq!(original.entity_count(), 0);
        assert_eq!(original.index_count(), 1);
        assert!(original.ordered_index::<PlanetOrder>().is_empty());
    }

    #[test]
    fn one_marker_can_define_both_index_kinds() {
        let mut storage = BackingStorage::<Sky>::new();
        storage.ordered_index_mut::<Orbits>().push(4);
        storage
            .grouped_index_mut::<Orbits>()
            .update(1, |moons| moons.extend([5, 6]));
        storage.ordered_index_mut::<Orbits>().push(5);

        assert_eq!(storage.index_count(), 3);
        assert_eq!(storage.ordered_index::<Orbits>().as_slice(), &[4, 5]);
        assert_eq!(storage.grouped_index::<Orbits>().members_of(&1), &[5, 6]);
        assert!(storage.grouped_index::<MoonsByPlanet>().is_empty());
    }

    #[test]
    fn clone_shares_untouched_slots() {
        let mut storage = BackingStorage::<Sky>::new();
        storage.table_mut::<Planet>().insert_or_update(Planet {
            id: 1,
            name: "Venus",
        });
        let snapshot = storage.clone();
        let key = TypeId::of::<Planet>();

        assert!(Arc::ptr_eq(
            storage.table_slot(&key).unwrap(),
            snapshot.table_slot(&key).unwrap()
        ));

        storage.table_mut::<Planet>().remove(&1);
        assert!(!Arc::ptr_eq(
            storage.table_slot(&key).unwrap(),
            snapshot.table_slot(&key).unwrap()
        ));
        assert!(snapshot.contains::<Planet>(&1));
    }
}
