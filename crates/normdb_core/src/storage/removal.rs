//! Removal sets.

use crate::entity::Entity;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identities deleted from each table during one commit.
///
/// Built by the batch engine from the commit's change-set and handed once to
/// every index so it can prune stale references. Sets are keyed by entity
/// type; each holds `HashSet<E::Id>`.
#[derive(Default)]
pub struct RemovalSet {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RemovalSet {
    /// Creates an empty removal set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the removal of one entity of type `E`.
    pub fn record<E: Entity>(&mut self, id: E::Id) {
        let set = self
            .tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HashSet::<E::Id>::new()));
        if let Some(set) = set.downcast_mut::<HashSet<E::Id>>() {
            set.insert(id);
        }
    }

    /// Adds an already type-erased `HashSet<E::Id>` for the table keyed `key`.
    pub(crate) fn insert_erased(&mut self, key: TypeId, ids: Box<dyn Any + Send + Sync>) {
        self.tables.insert(key, ids);
    }

    /// Returns the identities removed from the table of `E`, if any.
    #[must_use]
    pub fn ids<E: Entity>(&self) -> Option<&HashSet<E::Id>> {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|set| set.downcast_ref::<HashSet<E::Id>>())
    }

    /// Returns true if `id` was removed from the table of `E`.
    #[must_use]
    pub fn contains<E: Entity>(&self, id: &E::Id) -> bool {
        self.ids::<E>().is_some_and(|set| set.contains(id))
    }

    /// Returns true if nothing was removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the number of tables with removals.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl fmt::Debug for RemovalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalSet")
            .field("tables", &self.tables.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Tag(u8);

    impl Entity for Tag {
        type Id = u8;

        fn entity_id(&self) -> u8 {
            self.0
        }
    }

    #[derive(Debug, Clone)]
    struct Label(u8);

    impl Entity for Label {
        type Id = u8;

        fn entity_id(&self) -> u8 {
            self.0
        }
    }

    #[test]
    fn sets_are_keyed_by_entity_type() {
        let mut removal = RemovalSet::new();
        assert!(removal.is_empty());

        removal.record::<Tag>(Tag(1).entity_id());
        removal.record::<Tag>(2);

        assert!(removal.contains::<Tag>(&1));
        assert!(!removal.contains::<Label>(&1));
        assert!(removal.ids::<Label>().is_none());
        assert_eq!(removal.ids::<Tag>().unwrap().len(), 2);
        assert_eq!(removal.table_count(), 1);

        removal.record::<Label>(Label(1).entity_id());
        assert!(removal.contains::<Label>(&1));
        assert_eq!(removal.ids::<Tag>().unwrap().len(), 2);
        assert_eq!(removal.table_count(), 2);
    }
}
