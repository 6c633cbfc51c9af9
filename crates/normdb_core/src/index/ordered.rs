//! Ordered identity index.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::storage::RemovalSet;
use std::fmt;

/// A sequence of entity identities in caller-defined order.
///
/// The order is whatever the caller built (insertion order, a sort, a
/// ranking); it is unrelated to table iteration order. After every committed
/// transaction the index holds no identity that is absent from its member
/// table: deletions are pruned by [`apply_removal`](Self::apply_removal),
/// preserving the relative order of the survivors.
///
/// # Example
///
/// ```rust,ignore
/// ctx.ordered_index_mut::<AllBooks>().push(book.id);
/// let first = db.snapshot().ordered_index::<AllBooks>().get(0).cloned();
/// ```
pub struct OrderedIndex<E: Entity> {
    ids: Vec<E::Id>,
}

impl<E: Entity> OrderedIndex<E> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Appends an identity.
    pub fn push(&mut self, id: E::Id) {
        self.ids.push(id);
    }

    /// Appends every identity of the sequence, in order.
    pub fn extend<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = E::Id>,
    {
        self.ids.extend(ids);
    }

    /// Inserts an identity at `position`, shifting later ones back.
    ///
    /// `position == len()` appends.
    pub fn insert(&mut self, position: usize, id: E::Id) -> CoreResult<()> {
        if position > self.ids.len() {
            return Err(CoreError::invalid_operation(format!(
                "index position {position} out of bounds (len {})",
                self.ids.len()
            )));
        }
        self.ids.insert(position, id);
        Ok(())
    }

    /// Removes every occurrence of `id`. Returns true if any was removed.
    pub fn remove(&mut self, id: &E::Id) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    /// Removes and returns the identity at `position`.
    pub fn remove_at(&mut self, position: usize) -> Option<E::Id> {
        (position < self.ids.len()).then(|| self.ids.remove(position))
    }

    /// Removes every identity.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Returns true if `id` is in the index.
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.ids.contains(id)
    }

    /// Returns the position of the first occurrence of `id`.
    #[must_use]
    pub fn position(&self, id: &E::Id) -> Option<usize> {
        self.ids.iter().position(|existing| existing == id)
    }

    /// Returns the identity at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&E::Id> {
        self.ids.get(position)
    }

    /// Returns the number of identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the index holds no identity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates over identities in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, E::Id> {
        self.ids.iter()
    }

    /// Returns the identities as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[E::Id] {
        &self.ids
    }

    /// Copies the identities into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<E::Id> {
        self.ids.clone()
    }

    /// Drops every identity that `removal` lists for `E`.
    ///
    /// Runs in O(n) in place; the survivors keep their relative order.
    /// Returns true if anything was removed.
    pub fn apply_removal(&mut self, removal: &RemovalSet) -> bool {
        let Some(removed) = removal.ids::<E>() else {
            return false;
        };
        let before = self.ids.len();
        self.ids.retain(|id| !removed.contains(id));
        self.ids.len() != before
    }

    /// Returns true if [`apply_removal`](Self::apply_removal) would change
    /// this index.
    #[must_use]
    pub fn is_affected_by(&self, removal: &RemovalSet) -> bool {
        removal
            .ids::<E>()
            .is_some_and(|removed| self.ids.iter().any(|id| removed.contains(id)))
    }
}

impl<E: Entity> Default for OrderedIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for OrderedIndex<E> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
        }
    }
}

impl<E: Entity> PartialEq for OrderedIndex<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl<E: Entity> Eq for OrderedIndex<E> {}

impl<E: Entity> fmt::Debug for OrderedIndex<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.ids).finish()
    }
}

impl<E: Entity> FromIterator<E::Id> for OrderedIndex<E> {
    fn from_iter<I: IntoIterator<Item = E::Id>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a, E: Entity> IntoIterator for &'a OrderedIndex<E> {
    type Item = &'a E::Id;
    type IntoIter = std::slice::Iter<'a, E::Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Track {
        id: u32,
    }

    impl Entity for Track {
        type Id = u32;

        fn entity_id(&self) -> u32 {
            self.id
        }
    }

    #[derive(Debug, Clone)]
    struct Album {
        id: u32,
    }

    impl Entity for Album {
        type Id = u32;

        fn entity_id(&self) -> u32 {
            self.id
        }
    }

    fn index(ids: &[u32]) -> OrderedIndex<Track> {
        ids.iter().map(|&id| Track { id }.entity_id()).collect()
    }

    #[test]
    fn push_and_insert() {
        let mut idx = OrderedIndex::<Track>::new();
        idx.push(1);
        idx.push(3);
        idx.insert(1, 2).unwrap();
        idx.insert(3, 4).unwrap();

        assert_eq!(idx.as_slice(), &[1, 2, 3, 4]);
        assert!(idx.insert(9, 5).is_err());
    }

    #[test]
    fn remove_and_remove_at() {
        let mut idx = index(&[1, 2, 1, 3]);
        assert!(idx.remove(&1));
        assert!(!idx.remove(&1));
        assert_eq!(idx.as_slice(), &[2, 3]);

        assert_eq!(idx.remove_at(0), Some(2));
        assert_eq!(idx.remove_at(5), None);
        assert_eq!(idx.to_vec(), vec![3]);
    }

    #[test]
    fn apply_removal_preserves_order() {
        let mut idx = index(&[1, 2, 3, 4, 5]);
        let mut removal = RemovalSet::new();
        removal.record::<Track>(2);
        removal.record::<Track>(4);

        assert!(idx.is_affected_by(&removal));
        assert!(idx.apply_removal(&removal));
        assert_eq!(idx.as_slice(), &[1, 3, 5]);
        assert!(!idx.is_affected_by(&removal));
        assert!(!idx.apply_removal(&removal));
    }

    proptest! {
        #[test]
        fn apply_removal_keeps_survivors_in_order(
            ids in prop::collection::vec(0u32..32, 0..64),
            removed in prop::collection::hash_set(0u32..32, 0..16),
        ) {
            let mut idx = index(&ids);
            let mut removal = RemovalSet::new();
            for id in &removed {
                removal.record::<Track>(*id);
            }

            let affected = idx.is_affected_by(&removal);
            prop_assert_eq!(idx.apply_removal(&removal), affected);

            let survivors: Vec<u32> =
                ids.iter().copied().filter(|id| !removed.contains(id)).collect();
            prop_assert_eq!(idx.to_vec(), survivors);
            prop_assert!(!idx.is_affected_by(&removal));
        }
    }

    #[test]
    fn removal_of_other_type_is_ignored() {
        let mut idx = index(&[1, 2, 3]);
        let mut removal = RemovalSet::new();
        removal.record::<Album>(Album { id: 2 }.entity_id());

        assert!(!idx.is_affected_by(&removal));
        assert!(!idx.apply_removal(&removal));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn lookups() {
        let idx = index(&[7, 8, 9]);
        assert!(idx.contains(&8));
        assert_eq!(idx.position(&9), Some(2));
        assert_eq!(idx.get(0), Some(&7));
        assert_eq!(idx.iter().copied().sum::<u32>(), 24);
        assert_eq!(idx, index(&[7, 8, 9]));
        assert_ne!(idx, index(&[9, 8, 7]));
    }
}
