//! Database operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use normdb_bench::utils::{author_key, generate_authors, random_name, seeded_db, seeded_library};
use normdb_core::EntityId;
use normdb_testkit::{AllBooks, Author, Book, LibraryDb, LibraryStorage};
use rand::Rng;

/// Benchmark find-then-store of one author among 10k.
fn bench_update_find_and_store(c: &mut Criterion) {
    c.bench_function("update_find_and_store", |b| {
        let db = seeded_db(10_000);
        let id = EntityId::from_name(&author_key(100));

        b.iter(|| {
            db.perform_batch_updates(|ctx| {
                if let Some(author) = ctx.find::<Author>(black_box(&id)) {
                    let mut author = (*author).clone();
                    author.name = random_name(8);
                    ctx.insert_or_update(author);
                }
                Ok(())
            })
            .unwrap();
        });
    });
}

/// Benchmark in-place update of one author among 10k.
fn bench_update_in_place(c: &mut Criterion) {
    c.bench_function("update_in_place", |b| {
        let db = seeded_db(10_000);
        let id = EntityId::from_name(&author_key(100));

        b.iter(|| {
            db.perform_batch_updates(|ctx| {
                ctx.update_if_exists::<Author, _>(black_box(&id), |author| {
                    author.name = random_name(8);
                });
                Ok(())
            })
            .unwrap();
        });
    });
}

/// Benchmark inserting many authors one by one in a single batch.
fn bench_insert_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_many");

    for count in [1_000, 3_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let authors = generate_authors(count);

            b.iter(|| {
                let db = LibraryDb::new();
                db.perform_batch_updates(|ctx| {
                    for author in &authors {
                        ctx.insert_or_update(black_box(author.clone()));
                    }
                    Ok(())
                })
                .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark bulk insertion into an already large table.
fn bench_insert_into_fat_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_into_fat_store");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let db = seeded_db(count);
            let authors = generate_authors(count);

            b.iter(|| {
                db.perform_batch_updates(|ctx| {
                    ctx.insert_or_update_all(black_box(authors.iter().cloned()));
                    Ok(())
                })
                .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark batch overhead (empty batch).
fn bench_transaction_overhead(c: &mut Criterion) {
    c.bench_function("transaction_overhead", |b| {
        let db = seeded_library(100, 10);

        b.iter(|| {
            db.perform_batch_updates(|_ctx| Ok(())).unwrap();
        });
    });
}

/// Benchmark deleting a book with index cleanup.
fn bench_delete_with_cleanup(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_with_cleanup");

    for books_per_author in [10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(books_per_author),
            books_per_author,
            |b, &books_per_author| {
                b.iter_batched(
                    || {
                        let db = seeded_library(100, books_per_author);
                        let victim = db.snapshot().ordered_index::<AllBooks>().as_slice()[0];
                        (db, victim)
                    },
                    |(db, victim)| {
                        db.perform_batch_updates(|ctx| {
                            ctx.remove::<Book>(black_box(&victim));
                            Ok(())
                        })
                        .unwrap();
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

/// Benchmark memoized entity getter reads.
fn bench_getter(c: &mut Criterion) {
    let mut group = c.benchmark_group("getter");

    group.bench_function("cached_hit", |b| {
        let db = seeded_db(10_000);
        let getter =
            db.entity_getter::<Author, LibraryStorage>(EntityId::from_name(&author_key(100)));
        let snapshot = db.snapshot();

        b.iter(|| {
            black_box(getter.get(&snapshot));
        });
    });

    group.bench_function("cache_lookup", |b| {
        let db = seeded_db(1_000);
        let mut rng = rand::thread_rng();

        b.iter(|| {
            let id = EntityId::from_name(&author_key(rng.gen_range(0..1_000)));
            black_box(db.entity_getter::<Author, LibraryStorage>(id));
        });
    });

    group.bench_function("recompute_after_commit", |b| {
        let db = seeded_db(10_000);
        let id = EntityId::from_name(&author_key(100));
        let getter = db.entity_getter::<Author, LibraryStorage>(id);

        b.iter(|| {
            db.perform_batch_updates(|ctx| {
                ctx.update_if_exists::<Author, _>(&id, |author| author.name = random_name(8));
                Ok(())
            })
            .unwrap();
            black_box(getter.get(&db.snapshot()));
        });
    });

    group.finish();
}

/// Benchmark creating an empty storage from the schema.
fn bench_empty_storage(c: &mut Criterion) {
    c.bench_function("empty_storage", |b| {
        b.iter(|| black_box(LibraryStorage::new()));
    });
}

criterion_group!(
    benches,
    bench_update_find_and_store,
    bench_update_in_place,
    bench_insert_many,
    bench_insert_into_fat_store,
    bench_transaction_overhead,
    bench_delete_with_cleanup,
    bench_getter,
    bench_empty_storage,
);

criterion_main!(benches);
