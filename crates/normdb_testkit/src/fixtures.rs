//! Test fixtures and database helpers.
//!
//! Provides a small `Library` schema (authors and books, one ordered index
//! of every book and one grouping of books by author) and convenience
//! functions for setting up common test scenarios.

use normdb_core::{
    BackingStorage, BatchContext, Database, Entity, EntityId, GroupedIndexDef, InsertionResult,
    OrderedIndexDef, Schema, SchemaDecl, StoredIn,
};

/// An author. Stored in an equality-aware table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
}

impl Author {
    /// Creates an author with a fresh random identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }

    /// Creates an author whose identity is derived from `key`.
    pub fn keyed(key: &str, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::from_name(key),
            name: name.into(),
        }
    }
}

impl Entity for Author {
    type Id = EntityId;

    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn table_name() -> &'static str {
        "Author"
    }
}

/// A book written by one author. Stored in a plain table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Identity.
    pub id: EntityId,
    /// Identity of the author.
    pub author: EntityId,
    /// Title.
    pub title: String,
}

impl Book {
    /// Creates a book with a fresh random identity.
    pub fn new(author: &Author, title: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            author: author.id,
            title: title.into(),
        }
    }

    /// Creates a book whose identity is derived from `key`.
    pub fn keyed(key: &str, author: EntityId, title: impl Into<String>) -> Self {
        Self {
            id: EntityId::from_name(key),
            author,
            title: title.into(),
        }
    }
}

impl Entity for Book {
    type Id = EntityId;

    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn table_name() -> &'static str {
        "Book"
    }
}

/// Every book, in insertion order.
pub struct AllBooks;

impl OrderedIndexDef for AllBooks {
    type Schema = Library;
    type Member = Book;

    fn name() -> &'static str {
        "AllBooks"
    }
}

/// Books grouped by author.
pub struct BooksByAuthor;

impl GroupedIndexDef for BooksByAuthor {
    type Schema = Library;
    type Group = Author;
    type Member = Book;

    fn name() -> &'static str {
        "BooksByAuthor"
    }
}

/// The sample schema.
pub struct Library;

impl StoredIn<Library> for Author {}
impl StoredIn<Library> for Book {}

impl Schema for Library {
    fn declare(decl: &mut SchemaDecl<Self>) {
        decl.equatable_table::<Author>()
            .table::<Book>()
            .ordered_index::<AllBooks>()
            .grouped_index::<BooksByAuthor>();
    }
}

/// Storage of the sample schema.
pub type LibraryStorage = BackingStorage<Library>;

/// Database of the sample schema.
pub type LibraryDb = Database<Library>;

/// Writes `book` and links it into both indices.
///
/// A book already referenced by [`AllBooks`] is only rewritten.
pub fn add_book(ctx: &mut BatchContext<'_, Library>, book: Book) -> InsertionResult<Book> {
    let id = book.id;
    let author = book.author;
    let linked = ctx.ordered_index::<AllBooks>().contains(&id);
    let result = ctx.insert_or_update(book);

    if !linked {
        ctx.ordered_index_mut::<AllBooks>().push(id);
        ctx.grouped_index_mut::<BooksByAuthor>()
            .update(author, |books| books.push(id));
    }
    result
}

/// Runs a test with a fresh library database.
///
/// # Example
///
/// ```rust,ignore
/// use normdb_testkit::with_library_db;
///
/// #[test]
/// fn my_test() {
///     with_library_db(|db| {
///         assert_eq!(db.snapshot().entity_count(), 0);
///     });
/// }
/// ```
pub fn with_library_db<F, R>(f: F) -> R
where
    F: FnOnce(&LibraryDb) -> R,
{
    let db = LibraryDb::new();
    f(&db)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A database pre-populated with authors and their books.
    pub struct PopulatedLibrary {
        /// The database.
        pub db: LibraryDb,
        /// Authors, in insertion order.
        pub authors: Vec<Author>,
        /// Books, in insertion order.
        pub books: Vec<Book>,
    }

    /// Creates a database with `author_count` authors of `books_per_author`
    /// books each, written in one batch.
    pub fn populated_library(author_count: usize, books_per_author: usize) -> PopulatedLibrary {
        let db = LibraryDb::new();
        let authors: Vec<Author> = (0..author_count)
            .map(|i| Author::keyed(&format!("author-{i}"), format!("Author {i}")))
            .collect();
        let books: Vec<Book> = authors
            .iter()
            .flat_map(|author| {
                (0..books_per_author).map(move |j| {
                    Book::keyed(
                        &format!("{}-book-{j}", author.name),
                        author.id,
                        format!("Book {j}"),
                    )
                })
            })
            .collect();

        db.perform_batch_updates(|ctx| {
            ctx.insert_or_update_all(authors.iter().cloned());
            for book in &books {
                add_book(ctx, book.clone());
            }
            Ok(())
        })
        .expect("Failed to populate library");

        PopulatedLibrary { db, authors, books }
    }
}
