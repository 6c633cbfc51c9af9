//! Database container.

use crate::config::Config;
use crate::entity::InsertionResult;
use crate::error::CoreResult;
use crate::getter::{
    DatabaseEmbedding, EqualityComputer, Getter, GetterCache, GetterKind, RetainedValue,
};
use crate::schema::{Schema, StoredIn};
use crate::stats::DatabaseStats;
use crate::storage::BackingStorage;
use crate::transaction::{BatchContext, Commit, TransactionManager};
use std::fmt;
use std::sync::Arc;

/// The state container owning one normalized store.
///
/// `Database` is the primary entry point. It provides:
/// - the current committed [`BackingStorage`] snapshot
/// - atomic batch transactions
/// - memoized getters over any host state embedding the storage
/// - a bounded cache of per-identity getters
///
/// # Example
///
/// ```rust,ignore
/// use normdb_core::Database;
///
/// let db = Database::<Library>::new();
///
/// let author = db.perform_batch_updates(|ctx| {
///     let author = ctx.insert_or_update(Author::new("Ursula"));
///     Ok(author)
/// })?;
///
/// let getter = db.non_null_entity_getter_from::<_, BackingStorage<Library>>(&author);
/// assert_eq!(getter.get(&db.snapshot()).name, "Ursula");
/// ```
pub struct Database<S: Schema> {
    /// Configuration.
    config: Config,
    /// Transaction manager (owns the committed snapshot).
    transactions: TransactionManager<S>,
    /// Per-identity getter side-cache.
    getters: GetterCache,
    stats: Arc<DatabaseStats>,
}

impl<S: Schema> Database<S> {
    /// Creates an empty database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty database with custom configuration.
    ///
    /// ```rust,ignore
    /// let db = Database::<Library>::with_config(
    ///     Config::default().getter_cache_capacity(64).collect_stats(false),
    /// );
    /// ```
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let stats = Arc::new(if config.collect_stats {
            DatabaseStats::new()
        } else {
            DatabaseStats::disabled()
        });

        Self {
            transactions: TransactionManager::new(BackingStorage::new(), Arc::clone(&stats)),
            getters: GetterCache::new(config.getter_cache_capacity),
            stats,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the statistics counters.
    pub fn stats(&self) -> &DatabaseStats {
        &self.stats
    }

    /// Returns the current committed storage.
    ///
    /// Never blocks on a running batch; the snapshot is immutable.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BackingStorage<S>> {
        self.transactions.snapshot()
    }

    /// Runs `block` as one atomic batch and returns its value.
    ///
    /// Returning `Err` from the block discards every staged write.
    pub fn perform_batch_updates<R, F>(&self, block: F) -> CoreResult<R>
    where
        F: FnOnce(&mut BatchContext<'_, S>) -> CoreResult<R>,
    {
        self.perform_batch_updates_detailed(block)
            .map(|commit| commit.value)
    }

    /// Like [`perform_batch_updates`](Self::perform_batch_updates), also
    /// returning the committed snapshot and change-set.
    pub fn perform_batch_updates_detailed<R, F>(&self, block: F) -> CoreResult<Commit<S, R>>
    where
        F: FnOnce(&mut BatchContext<'_, S>) -> CoreResult<R>,
    {
        self.transactions.run(block)
    }

    /// Returns the number of cached per-identity getters.
    pub fn cached_getter_count(&self) -> usize {
        self.getters.len()
    }

    /// Drops every cached per-identity getter.
    ///
    /// Getters already handed out keep working; later requests build new ones.
    pub fn clear_getter_cache(&self) {
        self.getters.clear();
    }

    /// Makes a getter mapping the embedded storage through `map`.
    ///
    /// Recomputes only when the storage timestamps moved and, if given,
    /// `additional` also reports a change.
    pub fn getter<H, O, M>(
        &self,
        map: M,
        additional: Option<EqualityComputer<BackingStorage<S>>>,
    ) -> Getter<H, O>
    where
        H: DatabaseEmbedding<Schema = S>,
        O: Clone + Send + 'static,
        M: FnMut(&BackingStorage<S>) -> O + Send + 'static,
    {
        Self::build_getter(EqualityComputer::timestamps(), additional, map)
    }

    /// Returns the getter selecting the entity `id` of type `E`.
    ///
    /// Repeated requests for one identity share a getter while it stays
    /// in the cache.
    pub fn entity_getter<E, H>(&self, id: E::Id) -> Getter<H, Option<Arc<E>>>
    where
        E: StoredIn<S>,
        H: DatabaseEmbedding<Schema = S>,
    {
        self.getters
            .get_or_insert_with(GetterKind::Nullable, id.clone(), &self.stats, move || {
                Self::build_getter(EqualityComputer::table_timestamps::<E>(), None, move |db| {
                    db.find::<E>(&id)
                })
            })
    }

    /// Like [`entity_getter`](Self::entity_getter), adding a structural
    /// comparison: a rewrite with an equal value does not recompute.
    pub fn entity_getter_eq<E, H>(&self, id: E::Id) -> Getter<H, Option<Arc<E>>>
    where
        E: StoredIn<S> + PartialEq,
        H: DatabaseEmbedding<Schema = S>,
    {
        self.getters.get_or_insert_with(
            GetterKind::NullableStructural,
            id.clone(),
            &self.stats,
            move || {
                let structural = Self::structural::<E>(id.clone());
                Self::build_getter(
                    EqualityComputer::table_timestamps::<E>(),
                    Some(structural),
                    move |db| db.find::<E>(&id),
                )
            },
        )
    }

    /// Returns a getter that keeps yielding the last value it saw of
    /// `entity` once that entity is removed.
    pub fn non_null_entity_getter<E, H>(&self, entity: Arc<E>) -> Getter<H, Arc<E>>
    where
        E: StoredIn<S>,
        H: DatabaseEmbedding<Schema = S>,
    {
        let id = entity.entity_id();
        self.getters
            .get_or_insert_with(GetterKind::NonNull, id.clone(), &self.stats, move || {
                let mut retained = RetainedValue::new(entity);
                Self::build_getter(EqualityComputer::table_timestamps::<E>(), None, move |db| {
                    retained.observe(db.find::<E>(&id))
                })
            })
    }

    /// Like [`non_null_entity_getter`](Self::non_null_entity_getter), adding
    /// a structural comparison.
    pub fn non_null_entity_getter_eq<E, H>(&self, entity: Arc<E>) -> Getter<H, Arc<E>>
    where
        E: StoredIn<S> + PartialEq,
        H: DatabaseEmbedding<Schema = S>,
    {
        let id = entity.entity_id();
        self.getters.get_or_insert_with(
            GetterKind::NonNullStructural,
            id.clone(),
            &self.stats,
            move || {
                let structural = Self::structural::<E>(id.clone());
                let mut retained = RetainedValue::new(entity);
                Self::build_getter(
                    EqualityComputer::table_timestamps::<E>(),
                    Some(structural),
                    move |db| retained.observe(db.find::<E>(&id)),
                )
            },
        )
    }

    /// Chains a just-written entity straight into a non-null getter.
    pub fn non_null_entity_getter_from<E, H>(&self, result: &InsertionResult<E>) -> Getter<H, Arc<E>>
    where
        E: StoredIn<S>,
        H: DatabaseEmbedding<Schema = S>,
    {
        self.non_null_entity_getter(Arc::clone(&result.entity))
    }

    /// Builds one non-null getter per insertion result, in order.
    pub fn non_null_entity_getters_from<'a, E, H, I>(&self, results: I) -> Vec<Getter<H, Arc<E>>>
    where
        E: StoredIn<S>,
        H: DatabaseEmbedding<Schema = S>,
        I: IntoIterator<Item = &'a InsertionResult<E>>,
    {
        results
            .into_iter()
            .map(|result| self.non_null_entity_getter_from(result))
            .collect()
    }

    fn structural<E>(id: E::Id) -> EqualityComputer<BackingStorage<S>>
    where
        E: StoredIn<S> + PartialEq,
    {
        EqualityComputer::new(
            move |db: &BackingStorage<S>| db.find::<E>(&id),
            |a: &Option<Arc<E>>, b: &Option<Arc<E>>| a == b,
        )
    }

    fn build_getter<H, O, M>(
        timestamps: EqualityComputer<BackingStorage<S>>,
        additional: Option<EqualityComputer<BackingStorage<S>>>,
        mut map: M,
    ) -> Getter<H, O>
    where
        H: DatabaseEmbedding<Schema = S>,
        O: Clone + Send + 'static,
        M: FnMut(&BackingStorage<S>) -> O + Send + 'static,
    {
        let filter = match additional {
            Some(additional) => timestamps.or(additional),
            None => timestamps,
        };
        Getter::new(filter.embedded::<H>(), move |host: &H| {
            map(host.backing_storage())
        })
    }
}

impl<S: Schema> Default for Database<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("snapshot", &self.snapshot())
            .field("getters", &self.getters)
            .finish_non_exhaustive()
    }
}
