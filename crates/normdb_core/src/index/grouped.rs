//! Grouped identity index.

use crate::entity::Entity;
use crate::index::OrderedIndex;
use crate::storage::RemovalSet;
use std::collections::hash_map::Keys;
use std::collections::HashMap;
use std::fmt;

/// Maps a group entity's identity to an ordered index of member identities.
///
/// Lifecycle rules, enforced on every commit by
/// [`apply_removal`](Self::apply_removal):
/// - removing the group entity drops the whole group;
/// - removing a member entity drops only that reference from its group;
/// - a group left without members is pruned, so a key exists only while it
///   has at least one member.
///
/// # Cost
///
/// Member cleanup scans every group, O(G) per commit that removes any member
/// entity, regardless of how many groups actually hold the removed members.
/// With very large group counts this scan is the dominant commit cost.
pub struct GroupedIndex<G: Entity, M: Entity> {
    groups: HashMap<G::Id, OrderedIndex<M>>,
}

impl<G: Entity, M: Entity> GroupedIndex<G, M> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Returns the identities of every non-empty group.
    pub fn groups(&self) -> Keys<'_, G::Id, OrderedIndex<M>> {
        self.groups.keys()
    }

    /// Returns true if `group` currently has members.
    #[must_use]
    pub fn contains_group(&self, group: &G::Id) -> bool {
        self.groups.contains_key(group)
    }

    /// Returns the member identities of `group`, empty if it has none.
    #[must_use]
    pub fn members_of(&self, group: &G::Id) -> &[M::Id] {
        self.groups
            .get(group)
            .map(OrderedIndex::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the ordered index of `group`.
    #[must_use]
    pub fn group(&self, group: &G::Id) -> Option<&OrderedIndex<M>> {
        self.groups.get(group)
    }

    /// Mutates the ordered index of `group`, creating it empty if needed.
    ///
    /// A group the update leaves empty is removed.
    pub fn update<F>(&mut self, group: G::Id, update: F)
    where
        F: FnOnce(&mut OrderedIndex<M>),
    {
        let members = self.groups.entry(group.clone()).or_default();
        update(members);
        if members.is_empty() {
            self.groups.remove(&group);
        }
    }

    /// Removes `group` and all of its member references.
    pub fn remove_group(&mut self, group: &G::Id) -> Option<OrderedIndex<M>> {
        self.groups.remove(group)
    }

    /// Returns the number of non-empty groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the number of member references across all groups.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.groups.values().map(OrderedIndex::len).sum()
    }

    /// Returns true if no group exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Prunes references to removed entities.
    ///
    /// Two phases: groups whose group entity was removed are dropped
    /// outright; then every remaining group forwards the removal to its
    /// ordered index and is dropped if that leaves it empty.
    /// Returns true if anything changed.
    pub fn apply_removal(&mut self, removal: &RemovalSet) -> bool {
        let mut changed = false;

        if let Some(removed_groups) = removal.ids::<G>() {
            for group in removed_groups {
                changed |= self.groups.remove(group).is_some();
            }
        }

        if removal.ids::<M>().is_some() {
            self.groups.retain(|_, members| {
                changed |= members.apply_removal(removal);
                !members.is_empty()
            });
        }

        changed
    }

    /// Returns true if [`apply_removal`](Self::apply_removal) would change
    /// this index.
    #[must_use]
    pub fn is_affected_by(&self, removal: &RemovalSet) -> bool {
        let group_removed = removal
            .ids::<G>()
            .is_some_and(|removed| removed.iter().any(|g| self.groups.contains_key(g)));

        group_removed
            || self
                .groups
                .values()
                .any(|members| members.is_affected_by(removal))
    }
}

impl<G: Entity, M: Entity> Default for GroupedIndex<G, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Entity, M: Entity> Clone for GroupedIndex<G, M> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
        }
    }
}

impl<G: Entity, M: Entity> PartialEq for GroupedIndex<G, M> {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

impl<G: Entity, M: Entity> Eq for GroupedIndex<G, M> {}

impl<G: Entity, M: Entity> fmt::Debug for GroupedIndex<G, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.groups.iter()).finish()
    }
}
