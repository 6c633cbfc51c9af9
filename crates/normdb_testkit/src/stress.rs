//! Stress tests for NormDB.
//!
//! These tests verify behavior under heavy load and concurrent access:
//! writers are serialized by the database and readers only ever observe
//! fully committed snapshots.

use crate::fixtures::{add_book, AllBooks, Author, Book, BooksByAuthor, LibraryDb, LibraryStorage};
use normdb_core::CoreError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Logs a summary of the run.
    pub fn log_summary(&self, name: &str) {
        info!(
            name,
            total = self.total_ops,
            successful = self.successful_ops,
            failed = self.failed_ops,
            duration = ?self.duration,
            ops_per_second = self.ops_per_second,
            "stress run finished"
        );
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of books written per batch.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            batch_size: 10,
        }
    }
}

impl StressConfig {
    /// Number of threads to spawn; a zero count runs on one thread.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.max(1)
    }
}

/// Checks that the two indices agree: every book in `AllBooks` sits in
/// exactly one author group.
///
/// Both indices are written in the same batch, so a torn read shows up as a
/// count mismatch.
pub fn indices_agree(storage: &LibraryStorage) -> bool {
    let all = storage.ordered_index::<AllBooks>().len();
    let grouped = storage.grouped_index::<BooksByAuthor>().member_count();
    all == grouped && storage.table::<Book>().len() == all
}

/// Runs writers on `config.threads` threads, each committing its share of
/// `config.operations` batches.
///
/// Every batch inserts one author and `config.batch_size` books.
pub fn stress_concurrent_writers(db: Arc<LibraryDb>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let threads = config.thread_count();
    let batches_per_thread = config.operations / threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let batch_size = config.batch_size;

            thread::spawn(move || {
                for i in 0..batches_per_thread {
                    let result = db.perform_batch_updates(|ctx| {
                        let author = Author::keyed(&format!("writer-{t}-{i}"), "Writer");
                        for j in 0..batch_size {
                            add_book(ctx, Book::new(&author, format!("Book {j}")));
                        }
                        ctx.insert_or_update(author);
                        Ok(())
                    });

                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs one writer against `config.threads` readers.
///
/// Readers count a failure for every snapshot on which [`indices_agree`]
/// does not hold.
pub fn stress_readers_during_writes(db: Arc<LibraryDb>, config: &StressConfig) -> StressTestResult {
    let done = Arc::new(AtomicBool::new(false));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let readers: Vec<_> = (0..config.thread_count())
        .map(|_| {
            let db = Arc::clone(&db);
            let done = Arc::clone(&done);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    if indices_agree(&db.snapshot()) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    let author = Author::keyed("reader-stress", "Author");
    for i in 0..config.operations {
        let result = db.perform_batch_updates(|ctx| {
            ctx.insert_or_update(author.clone());
            for j in 0..config.batch_size {
                add_book(ctx, Book::new(&author, format!("{i}-{j}")));
            }
            Ok(())
        });
        if result.is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a transaction abort stress test.
///
/// Every other batch fails intentionally after writing.
pub fn stress_transaction_aborts(db: &LibraryDb, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let should_fail = i % 2 == 0;

        let result = db.perform_batch_updates(|ctx| {
            ctx.insert_or_update(Author::keyed(&format!("abort-{i}"), "Doomed"));

            if should_fail {
                Err(CoreError::transaction_aborted("intentional"))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Hammers one shared entity getter from `config.threads` threads while a
/// writer renames the entity.
///
/// A read fails if the getter yields a value the snapshot does not hold.
pub fn stress_shared_getter(db: Arc<LibraryDb>, config: &StressConfig) -> StressTestResult {
    let author = Author::keyed("getter-stress", "v0");
    let inserted = db
        .perform_batch_updates(|ctx| Ok(ctx.insert_or_update(author.clone())))
        .expect("Failed to seed author");
    let getter = db.non_null_entity_getter_from::<Author, LibraryStorage>(&inserted);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let threads = config.thread_count();
    let reads_per_thread = config.operations / threads;

    let start = Instant::now();

    let readers: Vec<_> = (0..threads)
        .map(|_| {
            let db = Arc::clone(&db);
            let getter = getter.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let id = author.id;

            thread::spawn(move || {
                for _ in 0..reads_per_thread {
                    let snapshot = db.snapshot();
                    let value = getter.get(&snapshot);
                    if snapshot.find::<Author>(&id).as_deref() == Some(&*value) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for i in 1..=config.operations / 10 {
        let _ = db.perform_batch_updates(|ctx| {
            ctx.update_if_exists::<Author, _>(&author.id, |a| a.name = format!("v{i}"));
            Ok(())
        });
    }

    for reader in readers {
        reader.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_writers() {
        crate::init_tracing();
        let db = Arc::new(LibraryDb::new());
        let config = StressConfig {
            operations: 200,
            threads: 4,
            batch_size: 5,
        };

        let result = stress_concurrent_writers(Arc::clone(&db), &config);
        result.log_summary("concurrent writers");
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 200);

        let snapshot = db.snapshot();
        assert_eq!(snapshot.table::<Author>().len(), 200);
        assert_eq!(snapshot.table::<Book>().len(), 1_000);
        assert!(indices_agree(&snapshot));
        assert_eq!(db.stats().transactions_committed(), 200);
    }

    #[test]
    fn test_readers_never_see_partial_commits() {
        let db = Arc::new(LibraryDb::new());
        let config = StressConfig {
            operations: 200,
            threads: 3,
            batch_size: 4,
        };

        let result = stress_readers_during_writes(Arc::clone(&db), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(db.snapshot().ordered_index::<AllBooks>().len(), 800);
    }

    #[test]
    fn test_transaction_aborts() {
        let db = LibraryDb::new();
        let config = StressConfig {
            operations: 100,
            ..Default::default()
        };

        let result = stress_transaction_aborts(&db, &config);
        // Half should succeed, half should fail (intentionally)
        assert_eq!(result.successful_ops, 50);
        assert_eq!(result.failed_ops, 50);
        assert_eq!(db.snapshot().table::<Author>().len(), 50);
        assert_eq!(db.stats().transactions_aborted(), 50);
    }

    #[test]
    fn test_shared_getter() {
        let db = Arc::new(LibraryDb::new());
        let config = StressConfig {
            operations: 2_000,
            threads: 4,
            batch_size: 1,
        };

        let result = stress_shared_getter(Arc::clone(&db), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 2_000);
    }

    #[test]
    fn test_zero_threads_runs_on_one() {
        let config = StressConfig {
            operations: 20,
            threads: 0,
            batch_size: 2,
        };
        assert_eq!(config.thread_count(), 1);

        let db = Arc::new(LibraryDb::new());
        let result = stress_concurrent_writers(Arc::clone(&db), &config);
        assert_eq!(result.successful_ops, 20);
        assert_eq!(db.snapshot().table::<Book>().len(), 40);

        let result = stress_shared_getter(Arc::new(LibraryDb::new()), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 20);
    }
}
