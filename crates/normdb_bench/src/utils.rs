//! Benchmark utilities.

use normdb_testkit::{add_book, Author, Book, LibraryDb};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random display name of the specified length.
pub fn random_name(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Key of the `i`-th generated author.
pub fn author_key(i: usize) -> String {
    format!("author.{i}")
}

/// Generate `count` authors with keyed identities.
pub fn generate_authors(count: usize) -> Vec<Author> {
    (0..count)
        .map(|i| Author::keyed(&author_key(i), random_name(12)))
        .collect()
}

/// Creates a database holding `count` authors, written in one batch.
pub fn seeded_db(count: usize) -> LibraryDb {
    let db = LibraryDb::new();
    let authors = generate_authors(count);
    db.perform_batch_updates(|ctx| {
        ctx.insert_or_update_all(authors);
        Ok(())
    })
    .expect("Failed to seed authors");
    db
}

/// Creates a database holding `authors` authors with `books_per_author`
/// indexed books each.
pub fn seeded_library(authors: usize, books_per_author: usize) -> LibraryDb {
    let db = LibraryDb::new();
    let generated = generate_authors(authors);
    db.perform_batch_updates(|ctx| {
        for author in &generated {
            for _ in 0..books_per_author {
                add_book(ctx, Book::new(author, random_name(16)));
            }
        }
        ctx.insert_or_update_all(generated.iter().cloned());
        Ok(())
    })
    .expect("Failed to seed library");
    db
}
