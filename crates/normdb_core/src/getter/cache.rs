//! Per-identity getter cache.

use crate::entity::EntityKey;
use crate::stats::DatabaseStats;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

/// Which flavour of per-identity getter an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum GetterKind {
    Nullable,
    NullableStructural,
    NonNull,
    NonNullStructural,
}

trait DynKey: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynKey) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<K: EntityKey> DynKey for K {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynKey) -> bool {
        other.as_any().downcast_ref::<K>() == Some(self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Getter type, flavour and entity identity.
#[derive(Clone)]
struct CacheKey {
    getter: TypeId,
    kind: GetterKind,
    id: Arc<dyn DynKey>,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.getter == other.getter && self.kind == other.kind && self.id.dyn_eq(&*other.id)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.getter.hash(state);
        self.kind.hash(state);
        self.id.dyn_hash(state);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(", self.kind)?;
        self.id.dyn_debug(f)?;
        write!(f, ")")
    }
}

struct CacheEntry {
    getter: Box<dyn Any + Send + Sync>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// `last_used` tick -> key, oldest first.
    recency: BTreeMap<u64, CacheKey>,
    clock: u64,
}

/// Bounded least-recently-used side-table of per-identity getters.
///
/// Owned by the database container. Entries are keyed by getter type,
/// flavour and identity, so nullable and non-null getters of one identity
/// never alias. The cache is opportunistic: an evicted getter is simply
/// rebuilt on the next request.
pub(crate) struct GetterCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl GetterCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.recency.clear();
    }

    /// Returns the cached getter for `(G, kind, id)` or builds and caches one.
    ///
    /// With zero capacity every call builds a fresh getter.
    pub(crate) fn get_or_insert_with<G, K, F>(
        &self,
        kind: GetterKind,
        id: K,
        stats: &DatabaseStats,
        build: F,
    ) -> G
    where
        G: Clone + Send + Sync + 'static,
        K: EntityKey,
        F: FnOnce() -> G,
    {
        if self.capacity == 0 {
            return build();
        }

        let key = CacheKey {
            getter: TypeId::of::<G>(),
            kind,
            id: Arc::new(id),
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.clock += 1;
        let now = state.clock;

        if let Some(entry) = state.entries.get_mut(&key) {
            if let Some(getter) = entry.getter.downcast_ref::<G>() {
                let getter = getter.clone();
                let previous = std::mem::replace(&mut entry.last_used, now);
                stats.record_cache_hit();
                trace!(key = ?key, "getter cache hit");
                state.recency.remove(&previous);
                state.recency.insert(now, key);
                return getter;
            }
        }

        stats.record_cache_miss();
        trace!(key = ?key, "getter cache miss");

        let getter = build();
        let entry = CacheEntry {
            getter: Box::new(getter.clone()),
            last_used: now,
        };
        if let Some(replaced) = state.entries.insert(key.clone(), entry) {
            state.recency.remove(&replaced.last_used);
        }
        state.recency.insert(now, key);

        while state.entries.len() > self.capacity {
            let Some((_, oldest)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&oldest);
            stats.record_cache_eviction();
            trace!(key = ?oldest, "getter cache eviction");
        }

        getter
    }
}

impl fmt::Debug for GetterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
