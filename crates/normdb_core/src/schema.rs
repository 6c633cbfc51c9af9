//! Schema declaration.
//!
//! A schema is a marker type naming the closed set of entity tables and
//! indices that compose one [`BackingStorage`]. Membership is checked at
//! compile time: an entity type can only be read or written through a
//! `BackingStorage<S>` if it implements [`StoredIn<S>`].
//!
//! # Example
//!
//! ```rust
//! use normdb_core::{Entity, EntityId, GroupedIndexDef, OrderedIndexDef, Schema, SchemaDecl, StoredIn};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Author { id: EntityId }
//! #[derive(Debug, Clone, PartialEq)]
//! struct Book { id: EntityId, author: EntityId }
//!
//! impl Entity for Author {
//!     type Id = EntityId;
//!     fn entity_id(&self) -> EntityId { self.id }
//! }
//! impl Entity for Book {
//!     type Id = EntityId;
//!     fn entity_id(&self) -> EntityId { self.id }
//! }
//!
//! struct Library;
//! impl StoredIn<Library> for Author {}
//! impl StoredIn<Library> for Book {}
//!
//! struct AllBooks;
//! impl OrderedIndexDef for AllBooks {
//!     type Schema = Library;
//!     type Member = Book;
//! }
//!
//! struct BooksByAuthor;
//! impl GroupedIndexDef for BooksByAuthor {
//!     type Schema = Library;
//!     type Group = Author;
//!     type Member = Book;
//! }
//!
//! impl Schema for Library {
//!     fn declare(decl: &mut SchemaDecl<Self>) {
//!         decl.equatable_table::<Author>()
//!             .equatable_table::<Book>()
//!             .ordered_index::<AllBooks>()
//!             .grouped_index::<BooksByAuthor>();
//!     }
//! }
//! ```

use crate::entity::{Entity, EntityTable};
use crate::index::{GroupedIndex, GroupedIndexDef, OrderedIndex, OrderedIndexDef};
use crate::storage::{grouped_key, ordered_key, BackingStorage};

/// Declares the tables and indices of one backing storage.
pub trait Schema: Sized + Send + Sync + 'static {
    /// Registers tables and indices, in declaration order.
    ///
    /// Index cleanup runs in the order indices are declared here.
    fn declare(decl: &mut SchemaDecl<Self>);
}

/// Marks `Self` as an entity type stored in schema `S`.
pub trait StoredIn<S: Schema>: Entity {}

fn structural_eq<E: PartialEq>(a: &E, b: &E) -> bool {
    a == b
}

/// Builder passed to [`Schema::declare`].
///
/// Declaring the same table or index twice keeps the first declaration.
pub struct SchemaDecl<S: Schema> {
    storage: BackingStorage<S>,
}

impl<S: Schema> SchemaDecl<S> {
    pub(crate) fn new() -> Self {
        Self {
            storage: BackingStorage::empty(),
        }
    }

    pub(crate) fn into_storage(self) -> BackingStorage<S> {
        self.storage
    }

    /// Declares a plain table for `E`.
    pub fn table<E: StoredIn<S>>(&mut self) -> &mut Self {
        self.storage.declare_table(EntityTable::<E>::new());
        self
    }

    /// Declares an equality-aware table for `E`.
    ///
    /// Writing a value equal to the stored one is a no-op that does not
    /// appear in the transaction's change-set.
    pub fn equatable_table<E: StoredIn<S> + PartialEq>(&mut self) -> &mut Self {
        self.storage
            .declare_table(EntityTable::<E>::with_equality(structural_eq::<E>));
        self
    }

    /// Declares an ordered index.
    pub fn ordered_index<I: OrderedIndexDef<Schema = S>>(&mut self) -> &mut Self {
        self.storage.declare_index(
            ordered_key::<I>(),
            I::name(),
            OrderedIndex::<I::Member>::new(),
        );
        self
    }

    /// Declares a grouped index.
    pub fn grouped_index<I: GroupedIndexDef<Schema = S>>(&mut self) -> &mut Self {
        self.storage.declare_index(
            grouped_key::<I>(),
            I::name(),
            GroupedIndex::<I::Group, I::Member>::new(),
        );
        self
    }
}
