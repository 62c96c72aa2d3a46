//! # Query Cache
//!
//! Caches warehouse results per `(query name, effective filter)` and purges
//! them by tag.
//!
//! - Concurrent misses on one key share a single computation. The
//!   computation runs on its own task, so a caller that stops waiting does
//!   not cancel it and its result still lands in the cache.
//! - A caller arriving after an invalidation never joins a computation
//!   that started before it; it starts a new one in that slot.
//! - Only successes are stored. A failure reaches every waiter of that
//!   computation and the next call computes again.
//! - Lookups hold the tag index read lock and invalidation holds the write
//!   lock, so a reader sees a tag either fully purged or untouched.
//! - No lock is held while a computation runs.

pub mod key;
pub mod tags;

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use moka::{sync::Cache, Expiry};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::filters::{EffectiveFilter, FilterError};
use crate::warehouse::{QueryResult, WarehouseError};

pub use key::CacheKey;
pub use tags::CacheTag;
use tags::{TagIndex, TagSnapshot};

/// How a query's results are cached
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub tags: Vec<CacheTag>,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(tags: &[CacheTag], ttl: Duration) -> Self {
        Self {
            tags: tags.to_vec(),
            ttl,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    value: QueryResult,
    created_at: Instant,
    ttl: Duration,
}

/// Per-entry expiry: each entry lives for its own query class TTL
struct PolicyExpiry;

impl Expiry<CacheKey, CachedResult> for PolicyExpiry {
    fn expire_after_create(&self, _key: &CacheKey, value: &CachedResult, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

type Flight = Shared<BoxFuture<'static, Result<QueryResult, WarehouseError>>>;

/// A running computation and the tag generations it started under
struct InFlight {
    id: u64,
    snapshot: TagSnapshot,
    flight: Flight,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub bypasses: u64,
    pub invalidations: u64,
    pub discarded: u64,
    pub entry_count: u64,
}

struct Inner {
    enabled: bool,
    entries: Cache<CacheKey, CachedResult>,
    index: RwLock<TagIndex>,
    in_flight: DashMap<CacheKey, InFlight>,
    next_flight: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    bypasses: AtomicU64,
    invalidations: AtomicU64,
    discarded: AtomicU64,
    #[cfg(test)]
    fail_key_encoding: std::sync::atomic::AtomicBool,
}

/// Permission-scoped query result cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self::build(true, max_capacity)
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::build(config.enabled, config.max_capacity)
    }

    fn build(enabled: bool, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PolicyExpiry)
            .build();

        Self {
            inner: Arc::new(Inner {
                enabled,
                entries,
                index: RwLock::new(TagIndex::default()),
                in_flight: DashMap::new(),
                next_flight: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                bypasses: AtomicU64::new(0),
                invalidations: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
                #[cfg(test)]
                fail_key_encoding: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    /// Return the cached result for `(query, filter)` or compute it
    ///
    /// `compute` runs at most once per key at a time. When the key cannot be
    /// encoded the query runs uncached and the failure is logged.
    pub async fn get<F, Fut>(
        &self,
        query: &str,
        filter: &EffectiveFilter,
        policy: &CachePolicy,
        compute: F,
    ) -> Result<QueryResult, WarehouseError>
    where
        F: FnOnce(EffectiveFilter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<QueryResult, WarehouseError>> + Send + 'static,
    {
        if !self.inner.enabled {
            self.inner.bypasses.fetch_add(1, Ordering::Relaxed);
            return compute(filter.clone()).await;
        }

        let key = match self.key_for(query, filter) {
            Ok(key) => key,
            Err(e) => {
                error!("Cache key encoding failed for query '{}', running uncached: {}", query, e);
                self.inner.bypasses.fetch_add(1, Ordering::Relaxed);
                return compute(filter.clone()).await;
            }
        };

        if let Some(value) = self.inner.lookup(&key) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {}", key);
            return Ok(value);
        }

        let flight = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if self.inner.index.read().is_current(&entry.get().snapshot) {
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight computation for {}", key);
                    entry.get().flight.clone()
                } else {
                    // The running computation started before one of its tags
                    // was invalidated; its rows must not reach a later caller.
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    debug!("In-flight computation for {} predates an invalidation, starting over", key);

                    let fresh = self.start(key, filter.clone(), policy.clone(), compute);
                    let flight = fresh.flight.clone();
                    entry.insert(fresh);
                    flight
                }
            }
            Entry::Vacant(entry) => {
                // A computation may have finished between the lookup above and
                // taking this entry; it stores before it leaves the map.
                if let Some(value) = self.inner.lookup(&key) {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", key);

                let fresh = self.start(key, filter.clone(), policy.clone(), compute);
                let flight = fresh.flight.clone();
                entry.insert(fresh);
                flight
            }
        };

        flight.await
    }

    fn key_for(&self, query: &str, filter: &EffectiveFilter) -> Result<CacheKey, FilterError> {
        #[cfg(test)]
        if self.inner.fail_key_encoding.load(Ordering::Relaxed) {
            return Err(FilterError::Encoding(serde::ser::Error::custom("key encoding disabled")));
        }
        CacheKey::derive(query, filter)
    }

    fn start<F, Fut>(&self, key: CacheKey, filter: EffectiveFilter, policy: CachePolicy, compute: F) -> InFlight
    where
        F: FnOnce(EffectiveFilter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<QueryResult, WarehouseError>> + Send + 'static,
    {
        let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.inner.index.read().snapshot(&policy.tags);
        let task_snapshot = snapshot.clone();
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let snapshot = task_snapshot;
            let _guard = InFlightGuard {
                inner: Arc::clone(&inner),
                key: key.clone(),
                id,
            };

            let result = compute(filter).await;
            match &result {
                Ok(value) => inner.store(key, value.clone(), &policy, &snapshot),
                Err(e) if e.is_transient() => warn!("Query '{}' failed, not caching: {}", key.query(), e),
                Err(e) => error!("Query '{}' failed, not caching: {}", key.query(), e),
            }
            result
        });

        let flight = task
            .map(|joined| match joined {
                Ok(result) => result,
                Err(e) => Err(WarehouseError::Aborted(e.to_string())),
            })
            .boxed()
            .shared();

        InFlight { id, snapshot, flight }
    }

    /// Purge every entry under `tag`; returns how many live entries went away
    pub fn invalidate(&self, tag: CacheTag) -> usize {
        let removed = self.inner.purge(tag);
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
        info!("Invalidated cache tag '{}' ({} entries)", tag, removed);
        removed
    }

    pub fn invalidate_all(&self) -> usize {
        CacheTag::ALL.into_iter().map(|tag| self.invalidate(tag)).sum()
    }

    /// Whether a fresh entry exists, without computing anything
    pub fn contains(&self, query: &str, filter: &EffectiveFilter) -> bool {
        CacheKey::derive(query, filter)
            .map(|key| self.inner.lookup(&key).is_some())
            .unwrap_or(false)
    }

    /// Number of live entries after pending expirations are applied
    pub fn entry_count(&self) -> u64 {
        self.inner.entries.run_pending_tasks();
        self.inner.entries.entry_count()
    }

    /// Drop index references to entries that expired or were evicted
    pub fn prune_index(&self) {
        let entries = &self.inner.entries;
        self.inner.index.write().retain_live(|key| entries.contains_key(key));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            bypasses: self.inner.bypasses.load(Ordering::Relaxed),
            invalidations: self.inner.invalidations.load(Ordering::Relaxed),
            discarded: self.inner.discarded.load(Ordering::Relaxed),
            entry_count: self.entry_count(),
        }
    }
}

impl Inner {
    fn lookup(&self, key: &CacheKey) -> Option<QueryResult> {
        let _index = self.index.read();
        self.entries.get(key).map(|cached| cached.value)
    }

    fn store(&self, key: CacheKey, value: QueryResult, policy: &CachePolicy, snapshot: &TagSnapshot) {
        let mut index = self.index.write();
        if !index.is_current(snapshot) {
            // One of the tags was invalidated while this ran; the rows may
            // predate the refresh.
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug!("Discarding result for {} computed across an invalidation", key);
            return;
        }

        index.register(&key, &policy.tags);
        self.entries.insert(
            key,
            CachedResult {
                value,
                created_at: Instant::now(),
                ttl: policy.ttl,
            },
        );
    }

    fn purge(&self, tag: CacheTag) -> usize {
        let mut index = self.index.write();
        index
            .purge(tag)
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|cached| cached.created_at.elapsed() < cached.ttl)
            .count()
    }
}

/// Clears the in-flight slot when the computing task ends, including by panic
///
/// Only its own slot: a newer computation may have replaced it after an
/// invalidation.
struct InFlightGuard {
    inner: Arc<Inner>,
    key: CacheKey,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove_if(&self.key, |_, running| running.id == self.id);
    }
}
