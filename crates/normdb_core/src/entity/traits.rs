//! Entity capability traits.

use std::fmt::Debug;
use std::hash::Hash;

/// A type usable as an entity identity.
///
/// Identities must be hashable and unique within their table. This trait is
/// blanket-implemented for every type meeting the bounds.
pub trait EntityKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> EntityKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A uniquely identified value stored in an [`EntityTable`](crate::EntityTable).
///
/// # Example
///
/// ```rust
/// use normdb_core::{Entity, EntityId};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Author {
///     id: EntityId,
///     name: String,
/// }
///
/// impl Entity for Author {
///     type Id = EntityId;
///
///     fn entity_id(&self) -> EntityId {
///         self.id
///     }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// The identity type of this entity.
    type Id: EntityKey;

    /// Returns the entity's stable identity.
    ///
    /// The identity must not change over the entity's lifetime.
    fn entity_id(&self) -> Self::Id;

    /// Returns the table name used in errors and logs.
    fn table_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
