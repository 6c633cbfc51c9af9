//! Property-based test generators using proptest.
//!
//! Operations address entities through a small key space so that generated
//! sequences collide: the same author is written twice, a removed book is
//! added again, and so on.

use crate::fixtures::{add_book, AllBooks, Author, Book, BooksByAuthor, Library, LibraryStorage};
use normdb_core::{BatchContext, CoreResult, EntityId};
use proptest::prelude::*;
use std::collections::HashSet;

/// Number of distinct keys per entity type.
pub const KEY_SPACE: u8 = 12;

/// Identity of the author with key `key`.
pub fn author_id(key: u8) -> EntityId {
    EntityId::from_name(&format!("author-{key}"))
}

/// Identity of the book with key `key`.
pub fn book_id(key: u8) -> EntityId {
    EntityId::from_name(&format!("book-{key}"))
}

/// One step of a generated batch.
#[derive(Debug, Clone)]
pub enum LibraryOperation {
    /// Insert or rewrite an author.
    PutAuthor {
        /// Author key
        key: u8,
        /// Author name
        name: String,
    },
    /// Add a book of an existing author and link it into the indices.
    AddBook {
        /// Book key
        key: u8,
        /// Author key
        author: u8,
    },
    /// Rename an author if present.
    RenameAuthor {
        /// Author key
        key: u8,
        /// New name
        name: String,
    },
    /// Remove an author if present.
    RemoveAuthor {
        /// Author key
        key: u8,
    },
    /// Remove a book if present.
    RemoveBook {
        /// Book key
        key: u8,
    },
}

/// Applies one operation inside a batch.
///
/// Removals act on the staged state, so a batch may remove what it created.
pub fn apply_operation(
    ctx: &mut BatchContext<'_, Library>,
    operation: &LibraryOperation,
) -> CoreResult<()> {
    match operation {
        LibraryOperation::PutAuthor { key, name } => {
            ctx.insert_or_update(Author {
                id: author_id(*key),
                name: name.clone(),
            });
        }
        LibraryOperation::AddBook { key, author } => {
            let author = author_id(*author);
            if ctx.find::<Author>(&author).is_some() && ctx.find::<Book>(&book_id(*key)).is_none()
            {
                add_book(ctx, Book::keyed(&format!("book-{key}"), author, "generated"));
            }
        }
        LibraryOperation::RenameAuthor { key, name } => {
            ctx.update_if_exists::<Author, _>(&author_id(*key), |author| {
                author.name = name.clone();
            });
        }
        LibraryOperation::RemoveAuthor { key } => {
            ctx.remove::<Author>(&author_id(*key));
        }
        LibraryOperation::RemoveBook { key } => {
            ctx.remove::<Book>(&book_id(*key));
        }
    }
    Ok(())
}

/// Applies every operation of a batch, in order.
pub fn apply_operations(
    ctx: &mut BatchContext<'_, Library>,
    operations: &[LibraryOperation],
) -> CoreResult<()> {
    operations
        .iter()
        .try_for_each(|operation| apply_operation(ctx, operation))
}

/// Checks that every index reference resolves to a live entity.
///
/// Returns a description of the first violation found.
pub fn check_referential_integrity(storage: &LibraryStorage) -> Result<(), String> {
    let books = storage.table::<Book>();
    let authors = storage.table::<Author>();

    let all_books = storage.ordered_index::<AllBooks>();
    let mut seen = HashSet::new();
    for id in all_books.iter() {
        if !books.contains(id) {
            return Err(format!("AllBooks references missing book {id}"));
        }
        if !seen.insert(*id) {
            return Err(format!("AllBooks references book {id} twice"));
        }
    }

    let by_author = storage.grouped_index::<BooksByAuthor>();
    for group in by_author.groups() {
        if !authors.contains(group) {
            return Err(format!("BooksByAuthor keeps group of missing author {group}"));
        }
        let members = by_author.members_of(group);
        if members.is_empty() {
            return Err(format!("BooksByAuthor keeps empty group {group}"));
        }
        if let Some(missing) = members.iter().find(|id| !books.contains(id)) {
            return Err(format!("BooksByAuthor references missing book {missing}"));
        }
    }

    Ok(())
}

/// Strategy for keys within [`KEY_SPACE`].
pub fn key_strategy() -> impl Strategy<Value = u8> {
    0..KEY_SPACE
}

/// Strategy for author names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,7}").expect("Invalid regex")
}

/// Strategy for generating library operations.
pub fn operation_strategy() -> impl Strategy<Value = LibraryOperation> {
    prop_oneof![
        3 => (key_strategy(), name_strategy())
            .prop_map(|(key, name)| LibraryOperation::PutAuthor { key, name }),
        4 => (key_strategy(), key_strategy())
            .prop_map(|(key, author)| LibraryOperation::AddBook { key, author }),
        1 => (key_strategy(), name_strategy())
            .prop_map(|(key, name)| LibraryOperation::RenameAuthor { key, name }),
        1 => key_strategy().prop_map(|key| LibraryOperation::RemoveAuthor { key }),
        2 => key_strategy().prop_map(|key| LibraryOperation::RemoveBook { key }),
    ]
}

/// Strategy for one batch of operations.
pub fn batch_strategy(max_ops: usize) -> impl Strategy<Value = Vec<LibraryOperation>> {
    prop::collection::vec(operation_strategy(), 1..max_ops)
}

/// Strategy for a sequence of batches.
pub fn batches_strategy(
    max_batches: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<Vec<LibraryOperation>>> {
    prop::collection::vec(batch_strategy(max_ops), 1..max_batches)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
