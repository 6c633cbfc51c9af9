//! Stateful equality comparators.

use crate::getter::DatabaseEmbedding;
use crate::schema::{Schema, StoredIn};
use crate::storage::BackingStorage;
use std::fmt;

/// Decides whether an input is "the same" as the previous one.
///
/// A computer remembers a key selected from the last input it saw. Each call
/// to [`is_equal`](Self::is_equal) selects the key of the new input, compares
/// it with the remembered one and then remembers the new key. The first call
/// always reports a change.
pub struct EqualityComputer<I> {
    check: Box<dyn FnMut(&I) -> bool + Send>,
}

impl<I: 'static> EqualityComputer<I> {
    /// Creates a computer comparing keys selected by `selector` with `equals`.
    pub fn new<K, Sel, Eq>(selector: Sel, equals: Eq) -> Self
    where
        K: Send + 'static,
        Sel: Fn(&I) -> K + Send + 'static,
        Eq: Fn(&K, &K) -> bool + Send + 'static,
    {
        let mut previous: Option<K> = None;
        Self::from_fn(move |input| {
            let key = selector(input);
            let equal = previous.as_ref().is_some_and(|prev| equals(prev, &key));
            previous = Some(key);
            equal
        })
    }

    /// Creates a computer comparing whole inputs with `predicate`.
    pub fn from_predicate<P>(predicate: P) -> Self
    where
        I: Clone + Send,
        P: Fn(&I, &I) -> bool + Send + 'static,
    {
        Self::new(I::clone, predicate)
    }

    /// Wraps a raw check. The closure owns whatever state it needs.
    pub fn from_fn<F>(check: F) -> Self
    where
        F: FnMut(&I) -> bool + Send + 'static,
    {
        Self {
            check: Box::new(check),
        }
    }

    /// Reports whether `input` equals the previous input, then remembers it.
    pub fn is_equal(&mut self, input: &I) -> bool {
        (self.check)(input)
    }

    /// Combines two computers: equal if `self` says so, else asks `other`.
    ///
    /// `other` only sees inputs that `self` reported as changed. When `self`
    /// is a cheap pre-check whose "equal" implies `other`'s key is unchanged
    /// too, `other`'s remembered key stays current.
    #[must_use]
    pub fn or(mut self, mut other: Self) -> Self {
        Self::from_fn(move |input| self.is_equal(input) || other.is_equal(input))
    }
}

impl<S: Schema> EqualityComputer<BackingStorage<S>> {
    /// Compares the storage-wide `(entity_updated_at, index_updated_at)` pair.
    #[must_use]
    pub fn timestamps() -> Self {
        Self::new(
            |storage: &BackingStorage<S>| {
                (storage.entity_updated_at(), storage.index_updated_at())
            },
            |a, b| a == b,
        )
    }

    /// Compares the `(table_updated_at, index_updated_at)` pair of `E`'s table.
    ///
    /// Commits that touch only other tables leave this pair unchanged.
    #[must_use]
    pub fn table_timestamps<E: StoredIn<S>>() -> Self {
        Self::new(
            |storage: &BackingStorage<S>| {
                (storage.table_updated_at::<E>(), storage.index_updated_at())
            },
            |a, b| a == b,
        )
    }

    /// Lifts this computer to any host state embedding the storage.
    #[must_use]
    pub fn embedded<H>(mut self) -> EqualityComputer<H>
    where
        H: DatabaseEmbedding<Schema = S>,
    {
        EqualityComputer::from_fn(move |host: &H| self.is_equal(host.backing_storage()))
    }
}

impl<I> fmt::Debug for EqualityComputer<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EqualityComputer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_input_is_never_equal() {
        let mut eq = EqualityComputer::from_predicate(|a: &u32, b: &u32| a == b);
        assert!(!eq.is_equal(&1));
        assert!(eq.is_equal(&1));
        assert!(!eq.is_equal(&2));
        assert!(eq.is_equal(&2));
    }

    #[test]
    fn selector_compares_keys_only() {
        let mut eq = EqualityComputer::new(|pair: &(u32, &'static str)| pair.0, |a, b| a == b);
        assert!(!eq.is_equal(&(1, "a")));
        assert!(eq.is_equal(&(1, "b")));
        assert!(!eq.is_equal(&(2, "b")));
    }

    #[test]
    fn or_short_circuits_on_first() {
        let mut eq = EqualityComputer::new(|pair: &(u32, u32)| pair.0, |a, b| a == b).or(
            EqualityComputer::new(|pair: &(u32, u32)| pair.1, |a, b| a == b),
        );

        assert!(!eq.is_equal(&(1, 10)));
        // first key changed, second did not
        assert!(eq.is_equal(&(2, 10)));
        // both changed
        assert!(!eq.is_equal(&(3, 11)));
        // first unchanged
        assert!(eq.is_equal(&(3, 99)));
    }
}
