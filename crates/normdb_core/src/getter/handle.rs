//! Memoized getters.

use crate::getter::EqualityComputer;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A memoized derivation from an input `H` to an output `O`.
///
/// On every [`get`](Self::get) the filter decides whether the input changed
/// since the last call. Unchanged input returns the cached output without
/// running the map; outputs are cloned out, so with `Arc` outputs a cache
/// hit hands back the same allocation.
///
/// `Getter` is a cheap handle: clones share the same cache, filter and map.
pub struct Getter<H, O> {
    inner: Arc<Mutex<GetterState<H, O>>>,
}

struct GetterState<H, O> {
    filter: EqualityComputer<H>,
    map: Box<dyn FnMut(&H) -> O + Send>,
    value: Option<O>,
    recomputations: u64,
}

impl<H: 'static, O: Clone + Send + 'static> Getter<H, O> {
    /// Creates a getter that recomputes `map` whenever `filter` reports a
    /// changed input.
    pub fn new<M>(filter: EqualityComputer<H>, map: M) -> Self
    where
        M: FnMut(&H) -> O + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(GetterState {
                filter,
                map: Box::new(map),
                value: None,
                recomputations: 0,
            })),
        }
    }

    /// Returns the output for `input`, recomputing only if it changed.
    ///
    /// The map runs with this getter locked; it must not call back into
    /// the same getter.
    pub fn get(&self, input: &H) -> O {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let unchanged = state.filter.is_equal(input);
        if unchanged {
            if let Some(value) = &state.value {
                return value.clone();
            }
        }

        let value = (state.map)(input);
        state.value = Some(value.clone());
        state.recomputations += 1;
        value
    }

    /// Returns the last computed output, if any.
    #[must_use]
    pub fn value(&self) -> Option<O> {
        self.inner.lock().value.clone()
    }

    /// Returns how many times the map has run.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.inner.lock().recomputations
    }

    /// Returns true if both handles share the same getter.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<H, O> Clone for Getter<H, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, O: fmt::Debug> fmt::Debug for Getter<H, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Getter")
            .field("value", &state.value)
            .field("recomputations", &state.recomputations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> Getter<u32, Arc<u64>> {
        Getter::new(
            EqualityComputer::from_predicate(|a: &u32, b: &u32| a == b),
            |n: &u32| Arc::new(u64::from(*n) * 2),
        )
    }

    #[test]
    fn equal_input_returns_cached_allocation() {
        let getter = doubling();
        let first = getter.get(&4);
        let second = getter.get(&4);

        assert_eq!(*first, 8);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(getter.recomputations(), 1);
    }

    #[test]
    fn changed_input_recomputes() {
        let getter = doubling();
        getter.get(&1);
        let out = getter.get(&2);

        assert_eq!(*out, 4);
        assert_eq!(getter.recomputations(), 2);
        assert_eq!(getter.value().as_deref(), Some(&4));
    }

    #[test]
    fn clones_share_state() {
        let getter = doubling();
        let other = getter.clone();
        getter.get(&3);

        assert!(getter.ptr_eq(&other));
        assert_eq!(other.value().as_deref(), Some(&6));
        assert!(!getter.ptr_eq(&doubling()));
    }

    #[test]
    fn getter_is_shareable_across_threads() {
        let getter = doubling();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let getter = getter.clone();
                std::thread::spawn(move || *getter.get(&5))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 10);
        }
        assert_eq!(getter.recomputations(), 1);
    }
}
