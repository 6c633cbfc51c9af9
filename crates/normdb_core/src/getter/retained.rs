//! Last-known-good value cell for non-null getters.

use std::sync::Arc;

/// Owned cell holding the last value a non-null getter has seen.
///
/// Each non-null getter exclusively owns one cell inside its map; the getter
/// lock makes that map the only writer.
#[derive(Debug)]
pub struct RetainedValue<E> {
    last: Arc<E>,
}

impl<E> RetainedValue<E> {
    /// Creates a cell seeded with `initial`.
    pub fn new(initial: Arc<E>) -> Self {
        Self { last: initial }
    }

    /// Returns the retained value.
    #[must_use]
    pub fn get(&self) -> &Arc<E> {
        &self.last
    }

    /// Records `current` if present and returns the retained value.
    ///
    /// `None` (the entity is gone) leaves the previous value in place.
    pub fn observe(&mut self, current: Option<Arc<E>>) -> Arc<E> {
        if let Some(current) = current {
            self.last = current;
        }
        Arc::clone(&self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_keeps_last_value() {
        let mut cell = RetainedValue::new(Arc::new("v1"));
        let v2 = Arc::new("v2");

        assert!(Arc::ptr_eq(&cell.observe(Some(Arc::clone(&v2))), &v2));
        assert_eq!(*cell.observe(None), "v2");
        assert_eq!(**cell.get(), "v2");
    }
}
