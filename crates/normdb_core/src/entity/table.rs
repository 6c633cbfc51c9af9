//! Identity-keyed storage for one entity type.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::types::Timestamp;
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Structural equality used by equality-aware tables.
pub(crate) type EqualityFn<E> = fn(&E, &E) -> bool;

/// The outcome of writing one entity.
///
/// Returned by write operations so callers can chain the freshly stored
/// entity straight into a getter without a second lookup.
#[derive(Debug)]
pub struct InsertionResult<E: Entity> {
    /// Identity of the written entity.
    pub id: E::Id,
    /// The value now stored in the table.
    pub entity: Arc<E>,
    /// Whether the write changed the stored value.
    ///
    /// Always true for plain tables. Equality-aware tables report false when
    /// the written value equals the one already stored.
    pub changed: bool,
}

impl<E: Entity> Clone for InsertionResult<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            entity: Arc::clone(&self.entity),
            changed: self.changed,
        }
    }
}

/// Identities that differ between two versions of a table.
#[derive(Debug)]
pub(crate) struct TableDiff<K> {
    pub(crate) inserted: HashSet<K>,
    pub(crate) updated: HashSet<K>,
    pub(crate) deleted: HashSet<K>,
}

impl<K> TableDiff<K> {
    pub(crate) fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Identity-keyed storage for entities of type `E`.
///
/// Holds at most one value per identity. Insert-or-update is the only write
/// path; there is no separate create/replace distinction. Values are held as
/// `Arc<E>`, so an entity that a transaction does not touch keeps the same
/// allocation across snapshots.
///
/// All lookups and single writes are O(1) amortized; bulk variants are O(k)
/// for k entities.
#[derive(Clone)]
pub struct EntityTable<E: Entity> {
    entries: HashMap<E::Id, Arc<E>>,
    equality: Option<EqualityFn<E>>,
    updated_at: Timestamp,
    /// Identities removed since the log was last drained at commit.
    removed: HashSet<E::Id>,
}

impl<E: Entity> EntityTable<E> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            equality: None,
            updated_at: Timestamp::ZERO,
            removed: HashSet::new(),
        }
    }

    /// Creates an empty equality-aware table.
    pub(crate) fn with_equality(equality: EqualityFn<E>) -> Self {
        Self {
            equality: Some(equality),
            ..Self::new()
        }
    }

    /// Returns true if writes of structurally equal values are no-ops.
    #[must_use]
    pub fn is_equality_aware(&self) -> bool {
        self.equality.is_some()
    }

    /// Inserts an entity, replacing any value stored under the same identity.
    pub fn insert_or_update(&mut self, entity: E) -> InsertionResult<E> {
        let id = entity.entity_id();
        self.store(id, entity)
    }

    /// Inserts or updates every entity of the sequence, in order.
    pub fn insert_or_update_all<I>(&mut self, entities: I) -> Vec<InsertionResult<E>>
    where
        I: IntoIterator<Item = E>,
    {
        entities
            .into_iter()
            .map(|entity| self.insert_or_update(entity))
            .collect()
    }

    /// Finds an entity by identity.
    #[must_use]
    pub fn find(&self, id: &E::Id) -> Option<&Arc<E>> {
        self.entries.get(id)
    }

    /// Finds every entity whose identity is in `ids`.
    ///
    /// Results follow the input order; absent identities are skipped.
    pub fn find_in<I>(&self, ids: I) -> Vec<Arc<E>>
    where
        I: IntoIterator,
        I::Item: Borrow<E::Id>,
    {
        ids.into_iter()
            .filter_map(|id| self.entries.get(id.borrow()).cloned())
            .collect()
    }

    /// Returns true if an entity with this identity is stored.
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.entries.contains_key(id)
    }

    /// Removes one entity, returning it if it was present.
    pub fn remove(&mut self, id: &E::Id) -> Option<Arc<E>> {
        let removed = self.entries.remove(id)?;
        self.removed.insert(id.clone());
        Some(removed)
    }

    /// Removes every entity whose identity is in `ids`.
    ///
    /// Returns the number of entities actually removed.
    pub fn remove_all<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator,
        I::Item: Borrow<E::Id>,
    {
        let mut removed = 0;
        for id in ids {
            if self.remove(id.borrow()).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Applies `mutator` to a copy of the stored entity and writes it back.
    ///
    /// Absence is not an error: returns `None` and leaves the table untouched
    /// when no entity has this identity.
    pub fn update_if_exists<F>(&mut self, id: &E::Id, mutator: F) -> Option<Arc<E>>
    where
        F: FnOnce(&mut E),
    {
        let mut value = E::clone(self.entries.get(id)?);
        mutator(&mut value);
        debug_assert!(
            value.entity_id() == *id,
            "mutator changed the identity of an entity in {}",
            E::table_name()
        );
        Some(self.store(id.clone(), value).entity)
    }

    /// Like [`update_if_exists`](Self::update_if_exists) but fails with
    /// [`CoreError::EntityNotFound`] when the identity is absent.
    pub fn update<F>(&mut self, id: &E::Id, mutator: F) -> CoreResult<Arc<E>>
    where
        F: FnOnce(&mut E),
    {
        self.update_if_exists(id, mutator)
            .ok_or_else(|| CoreError::entity_not_found::<E>(id))
    }

    /// Returns the number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over stored identities in unspecified order.
    pub fn ids(&self) -> impl Iterator<Item = &E::Id> {
        self.entries.keys()
    }

    /// Iterates over stored entities in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&E::Id, &Arc<E>)> {
        self.entries.iter()
    }

    /// Collects every stored entity, in unspecified order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<E>> {
        self.entries.values().cloned().collect()
    }

    /// Returns the timestamp of the last commit that changed this table.
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub(crate) fn set_updated_at(&mut self, ts: Timestamp) {
        self.updated_at = ts;
    }

    /// Drains the removal log, keeping only identities still absent.
    ///
    /// An identity removed and then written again is live and not reported.
    pub(crate) fn take_removed(&mut self) -> HashSet<E::Id> {
        let mut removed = std::mem::take(&mut self.removed);
        removed.retain(|id| !self.entries.contains_key(id));
        removed
    }

    fn store(&mut self, id: E::Id, entity: E) -> InsertionResult<E> {
        if let (Some(equals), Some(existing)) = (self.equality, self.entries.get(&id)) {
            if equals(existing, &entity) {
                return InsertionResult {
                    entity: Arc::clone(existing),
                    id,
                    changed: false,
                };
            }
        }

        let entity = Arc::new(entity);
        self.entries.insert(id.clone(), Arc::clone(&entity));
        InsertionResult {
            id,
            entity,
            changed: true,
        }
    }

    /// Computes which identities differ from `before`.
    ///
    /// An entity counts as updated when its allocation changed, unless the
    /// table is equality-aware and the two values compare equal.
    pub(crate) fn diff(&self, before: &Self) -> TableDiff<E::Id> {
        let mut inserted = HashSet::new();
        let mut updated = HashSet::new();

        for (id, after) in &self.entries {
            match before.entries.get(id) {
                None => {
                    inserted.insert(id.clone());
                }
                Some(prev) if !Arc::ptr_eq(prev, after) => {
                    let same = self.equality.is_some_and(|equals| equals(prev, after));
                    if !same {
                        updated.insert(id.clone());
                    }
                }
                Some(_) => {}
            }
        }

        let deleted = before
            .entries
            .keys()
            .filter(|id| !self.entries.contains_key(id))
            .cloned()
            .collect();

        TableDiff {
            inserted,
            updated,
            deleted,
        }
    }
}

impl<E: Entity> Default for EntityTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for EntityTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTable")
            .field("table", &E::table_name())
            .field("len", &self.len())
            .field("equality_aware", &self.is_equality_aware())
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    #[derive(Debug, Clone, PartialEq)]
    struct Author {
        id: EntityId,
        name: String,
    }

    impl Author {
        fn named(key: &str, name: &str) -> Self {
            Self {
                id: EntityId::from_name(key),
                name: name.to_string(),
            }
        }
    }

    impl Entity for Author {
        type Id = EntityId;

        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn table_name() -> &'static str {
            "authors"
        }
    }

    fn equatable() -> EntityTable<Author> {
        EntityTable::with_equality(|a, b| a == b)
    }

    #[test]
    fn insert_and_find() {
        let mut table = EntityTable::new();
        let author = Author::named("author.1", "Ursula");

        let result = table.insert_or_update(author.clone());
        assert!(result.changed);
        assert_eq!(result.id, author.id);

        assert_eq!(table.find(&author.id).map(|a| a.as_ref()), Some(&author));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn repeated_inserts_keep_last_value() {
        let mut table = EntityTable::new();
        table.insert_or_update(Author::named("a", "first"));
        table.insert_or_update(Author::named("a", "second"));
        table.insert_or_update(Author::named("a", "third"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(&EntityId::from_name("a")).unwrap().name, "third");
    }

    #[test]
    fn find_in_follows_input_order_and_skips_missing() {
        let mut table = EntityTable::new();
        table.insert_or_update_all(vec![
            Author::named("a", "A"),
            Author::named("b", "B"),
            Author::named("c", "C"),
        ]);

        let ids = [
            EntityId::from_name("c"),
            EntityId::from_name("missing"),
            EntityId::from_name("a"),
        ];
        let found: Vec<_> = table.find_in(&ids).iter().map(|a| a.name.clone()).collect();
        assert_eq!(found, vec!["C", "A"]);
    }

    #[test]
    fn remove_all_counts_removed() {
        let mut table = EntityTable::new();
        table.insert_or_update_all(vec![Author::named("a", "A"), Author::named("b", "B")]);

        let removed = table.remove_all([EntityId::from_name("a"), EntityId::from_name("zzz")]);
        assert_eq!(removed, 1);
        assert!(!table.contains(&EntityId::from_name("a")));
        assert!(table.contains(&EntityId::from_name("b")));
    }

    #[test]
    fn update_if_exists_is_soft() {
        let mut table: EntityTable<Author> = EntityTable::new();
        let missing = EntityId::from_name("missing");

        assert!(table.update_if_exists(&missing, |a| a.name.push('!')).is_none());
        assert!(table.is_empty());

        table.insert_or_update(Author::named("a", "A"));
        let updated = table
            .update_if_exists(&EntityId::from_name("a"), |a| a.name.push('!'))
            .unwrap();
        assert_eq!(updated.name, "A!");
    }

    #[test]
    fn strict_update_reports_not_found() {
        let mut table: EntityTable<Author> = EntityTable::new();
        let err = table
            .update(&EntityId::from_name("missing"), |a| a.name.clear())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("authors"));
    }

    #[test]
    fn equality_aware_write_of_equal_value_is_noop() {
        let mut table = equatable();
        let first = table.insert_or_update(Author::named("a", "A"));
        let second = table.insert_or_update(Author::named("a", "A"));

        assert!(!second.changed);
        assert!(Arc::ptr_eq(&first.entity, &second.entity));

        let third = table.insert_or_update(Author::named("a", "B"));
        assert!(third.changed);
    }

    #[test]
    fn diff_classifies_changes() {
        let mut before = EntityTable::new();
        before.insert_or_update_all(vec![
            Author::named("keep", "K"),
            Author::named("edit", "E"),
            Author::named("drop", "D"),
        ]);

        let mut after = before.clone();
        after.insert_or_update(Author::named("new", "N"));
        after.update_if_exists(&EntityId::from_name("edit"), |a| a.name = "E2".into());
        after.remove(&EntityId::from_name("drop"));

        let diff = after.diff(&before);
        assert_eq!(diff.inserted, HashSet::from([EntityId::from_name("new")]));
        assert_eq!(diff.updated, HashSet::from([EntityId::from_name("edit")]));
        assert_eq!(diff.deleted, HashSet::from([EntityId::from_name("drop")]));
    }

    #[test]
    fn diff_ignores_equal_rewrites_in_equality_aware_table() {
        let mut before = equatable();
        before.insert_or_update(Author::named("a", "A"));

        let mut after = before.clone();
        after.update_if_exists(&EntityId::from_name("a"), |a| a.name = "B".into());
        after.update_if_exists(&EntityId::from_name("a"), |a| a.name = "A".into());

        assert!(after.diff(&before).is_empty());
    }

    #[test]
    fn removal_log_reports_identities_still_absent() {
        let mut table = EntityTable::new();
        table.insert_or_update(Author::named("old", "O"));
        assert!(table.take_removed().is_empty());

        table.insert_or_update(Author::named("fresh", "F"));
        table.insert_or_update(Author::named("back", "B"));
        table.remove(&EntityId::from_name("fresh"));
        table.remove_all([EntityId::from_name("old"), EntityId::from_name("back")]);
        table.insert_or_update(Author::named("back", "B2"));
        table.remove(&EntityId::from_name("never"));

        let removed = table.take_removed();
        assert_eq!(
            removed,
            HashSet::from([EntityId::from_name("fresh"), EntityId::from_name("old")])
        );
        assert!(table.take_removed().is_empty());
    }

    #[test]
    fn plain_table_rewrite_counts_as_update() {
        let mut before = EntityTable::new();
        before.insert_or_update(Author::named("a", "A"));

        let mut after = before.clone();
        after.insert_or_update(Author::named("a", "A"));

        assert_eq!(after.diff(&before).updated.len(), 1);
    }
}
