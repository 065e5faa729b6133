//! Expiration cache store
//!
//! Composes one reader/writer lock, a per-key [`PolicySet`] registry and a
//! [`BackingStore`] into the public cache API. Expiration is lazy: policies
//! are evaluated when an entry is read (`get_item`, `contains`, `keys`), and
//! an entry found expired is removed from the backing store on the spot.
//! Nothing runs in the background.
//!
//! Locking is coarse: one lock per store instance, not per key.
//!
//! | Operation | Lock |
//! |-----------|------|
//! | `add`, `remove`, `clear`, `purge_expired` | exclusive |
//! | `get_item`, `contains`, `keys`, `count`, `stats` | shared |
//!
//! A read that finds an expired entry releases its shared hold, takes the
//! exclusive lock and re-checks the entry before evicting it, since another
//! writer may have replaced it in between.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use super::config::StoreConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::error::{CacheError, CacheResult};
use crate::policy::PolicySet;
use crate::store::{BackingStore, MemoryStore};
use crate::sync::{LockReader, LockWriter, RawReaderWriter, ReaderWriterLock};
use crate::time::{Clock, SystemClock};

/// Everything the store lock protects
struct Entries<V> {
    backing: Box<dyn BackingStore<V>>,
    /// Keys without an entry here never expire
    policies: HashMap<String, PolicySet>,
}

impl<V> Entries<V> {
    fn is_expired(&self, key: &str, now: Instant) -> CacheResult<bool> {
        match self.policies.get(key) {
            Some(policies) => Ok(policies.is_expired(key, now)?),
            None => Ok(false),
        }
    }

    /// Keys among `candidates` whose policies report expiration at `now`
    fn expired_among<I>(&self, candidates: I, now: Instant) -> CacheResult<Vec<String>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut expired = Vec::new();
        for key in candidates {
            if self.is_expired(&key, now)? {
                expired.push(key);
            }
        }
        Ok(expired)
    }

    fn evict(&mut self, key: &str) -> bool {
        self.policies.remove(key);
        self.backing.remove(key).is_some()
    }
}

/// Thread-safe cache with per-entry expiration policies
///
/// # Type Parameters
/// - `V`: Value type (must be `Clone`; reads hand out copies)
/// - `C`: Clock used for policy evaluation (defaults to `SystemClock`)
/// - `L`: Reader/writer primitive (defaults to `ReaderWriterLock`)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
/// use expiration_cache::policy::SlidingExpirationPolicy;
///
/// let store: ExpirationCacheStore<String> = ExpirationCacheStore::new(StoreConfig::default());
///
/// store.add("user:1", "Alice".to_string())?;
/// assert_eq!(store.get_item("user:1")?, Some("Alice".to_string()));
///
/// store.add_with_policies(
///     "session:1",
///     "token".to_string(),
///     SlidingExpirationPolicy::new(Duration::from_secs(2)),
/// )?;
/// assert!(store.contains("session:1")?);
/// assert_eq!(store.count()?, 2);
/// # Ok::<(), expiration_cache::error::CacheError>(())
/// ```
///
/// # Re-entrancy
///
/// A thread holding a shared [`LockReader`] on [`lock`](Self::lock) may read
/// valid entries, but gets `LockError::RecursionViolation` from any operation
/// that needs to write, including a read that has to evict. Factories passed to `get_item_with` run without the lock
/// held and may use the store freely.
pub struct ExpirationCacheStore<V, C = SystemClock, L = ReaderWriterLock>
where
    C: Clock,
    L: RawReaderWriter,
{
    lock: Arc<L>,
    // The outer lock decides who may touch the entries; this cell only gives
    // safe interior mutability and is never contended.
    entries: RwLock<Entries<V>>,
    config: StoreConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<V> ExpirationCacheStore<V, SystemClock, ReaderWriterLock>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store over an in-process [`MemoryStore`]
    pub fn new(config: StoreConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }

    /// Create a store over the given backing store
    pub fn with_store<S>(config: StoreConfig, store: S) -> Self
    where
        S: BackingStore<V> + 'static,
    {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<V, C> ExpirationCacheStore<V, C, ReaderWriterLock>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Create a store with a custom clock (useful for testing)
    pub fn with_clock<S>(config: StoreConfig, store: S, clock: C) -> Self
    where
        S: BackingStore<V> + 'static,
    {
        Self::with_parts(config, store, clock, Arc::new(ReaderWriterLock::new()))
    }
}

impl<V, C, L> ExpirationCacheStore<V, C, L>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
    L: RawReaderWriter,
{
    /// Create a store from all of its parts
    ///
    /// The lock may be shared with other components that must coordinate
    /// with this store.
    pub fn with_parts<S>(config: StoreConfig, store: S, clock: C, lock: Arc<L>) -> Self
    where
        S: BackingStore<V> + 'static,
    {
        Self {
            lock,
            entries: RwLock::new(Entries { backing: Box::new(store), policies: HashMap::new() }),
            config,
            metrics: MetricsCollector::new(),
            clock,
        }
    }

    /// Store name from the configuration
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The lock guarding this store
    pub fn lock(&self) -> &Arc<L> {
        &self.lock
    }

    /// Add an entry that never expires, replacing any existing entry
    pub fn add<K: Into<String>>(&self, key: K, value: V) -> CacheResult<()> {
        self.add_with_policies(key, value, PolicySet::new())
    }

    /// Add an entry guarded by `policies`, replacing any existing entry
    ///
    /// Value and policy set are replaced together under the exclusive lock;
    /// an empty set means the entry never expires.
    pub fn add_with_policies<K, P>(&self, key: K, value: V, policies: P) -> CacheResult<()>
    where
        K: Into<String>,
        P: Into<PolicySet>,
    {
        let key = key.into();
        let policies = policies.into();

        let writer = self.write_guard()?;
        let now = self.clock.now();
        policies.attach(&key, now);

        let mut entries = self.entries_mut(&writer);
        entries.backing.insert(key.clone(), value);
        if policies.is_empty() {
            entries.policies.remove(&key);
        } else {
            entries.policies.insert(key, policies);
        }

        if self.config.track_metrics {
            self.metrics.record_insert();
        }
        Ok(())
    }

    /// Get a value
    ///
    /// Returns `None` if the key is absent or expired; an expired entry is
    /// removed before returning. A valid entry's policies are told about
    /// the access (renewing sliding windows).
    pub fn get_item(&self, key: &str) -> CacheResult<Option<V>> {
        let reader = self.read_guard()?;
        let now = self.clock.now();

        {
            let entries = self.entries(&reader);
            let Some(value) = entries.backing.read(key) else {
                self.record_miss(key);
                return Ok(None);
            };

            match entries.policies.get(key) {
                Some(policies) if policies.is_expired(key, now)? => {}
                Some(policies) => {
                    policies.touch(key, now);
                    self.record_hit(key);
                    return Ok(Some(value));
                }
                None => {
                    self.record_hit(key);
                    return Ok(Some(value));
                }
            }
        }

        self.evict_if_expired(reader, key)?;
        self.record_miss(key);
        Ok(None)
    }

    /// Get a value, computing and adding it on a miss
    ///
    /// The factory runs without the lock held, so slow computations do not
    /// block other keys. Two callers missing at once may both compute; the
    /// last add wins. At-most-once evaluation is not guaranteed.
    pub fn get_item_with<F>(&self, key: &str, factory: F) -> CacheResult<V>
    where
        F: FnOnce() -> V,
    {
        self.try_get_item_with(key, || Ok::<_, CacheError>(factory()))
    }

    /// Fallible variant of [`get_item_with`](Self::get_item_with)
    ///
    /// A factory error is returned as is and nothing is cached.
    ///
    /// ```
    /// use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
    /// use expiration_cache::error::CacheError;
    ///
    /// #[derive(Debug)]
    /// enum LoadError {
    ///     Parse(std::num::ParseIntError),
    ///     Cache(CacheError),
    /// }
    ///
    /// impl From<CacheError> for LoadError {
    ///     fn from(err: CacheError) -> Self {
    ///         Self::Cache(err)
    ///     }
    /// }
    ///
    /// let store: ExpirationCacheStore<u32> = ExpirationCacheStore::new(StoreConfig::default());
    ///
    /// let port = store.try_get_item_with("port", || "8080".parse().map_err(LoadError::Parse));
    /// assert_eq!(port.unwrap(), 8080);
    ///
    /// let bad = store.try_get_item_with("bad", || "x".parse().map_err(LoadError::Parse));
    /// assert!(matches!(bad, Err(LoadError::Parse(_))));
    /// assert!(!store.contains("bad").unwrap());
    /// ```
    pub fn try_get_item_with<F, E>(&self, key: &str, factory: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get_item(key)? {
            return Ok(value);
        }

        let value = factory()?;
        self.add(key, value.clone())?;
        Ok(value)
    }

    /// Remove an entry and its policies
    ///
    /// Returns the stored value, if any. Policies are not consulted, so a
    /// failing policy can never pin an entry in the store.
    pub fn remove(&self, key: &str) -> CacheResult<Option<V>> {
        let writer = self.write_guard()?;
        let mut entries = self.entries_mut(&writer);

        entries.policies.remove(key);
        let removed = entries.backing.remove(key);

        if removed.is_some() && self.config.track_metrics {
            self.metrics.record_removal();
        }
        Ok(removed)
    }

    /// Check whether a valid entry exists for `key`
    ///
    /// Performs the same expiration check as `get_item` (evicting an expired
    /// entry) but does not count as an access: sliding windows are not
    /// renewed.
    pub fn contains(&self, key: &str) -> CacheResult<bool> {
        let reader = self.read_guard()?;
        let now = self.clock.now();

        {
            let entries = self.entries(&reader);
            if !entries.backing.contains(key) {
                return Ok(false);
            }
            if !entries.is_expired(key, now)? {
                return Ok(true);
            }
        }

        self.evict_if_expired(reader, key)?;
        Ok(false)
    }

    /// Remove all entries and their policies
    pub fn clear(&self) -> CacheResult<()> {
        let writer = self.write_guard()?;
        let mut entries = self.entries_mut(&writer);

        entries.backing.clear();
        entries.policies.clear();

        debug!(store = %self.config.name, "cleared cache store");
        Ok(())
    }

    /// Snapshot of the keys of all valid entries
    ///
    /// Entries found expired are evicted as part of the call. Keys come back
    /// in backing-store order, which is unspecified.
    pub fn keys(&self) -> CacheResult<Vec<String>> {
        let reader = self.read_guard()?;
        let now = self.clock.now();

        let (keys, expired) = {
            let entries = self.entries(&reader);
            let keys = entries.backing.read_keys();
            let expired = entries
                .expired_among(keys.iter().filter(|k| entries.policies.contains_key(*k)).cloned(), now)?;
            (keys, expired)
        };

        if expired.is_empty() {
            return Ok(keys);
        }

        let gone = self.evict_all_expired(reader, expired)?;
        Ok(keys.into_iter().filter(|key| !gone.contains(key)).collect())
    }

    /// Number of stored entries
    ///
    /// This is a raw count: entries that have expired but have not been
    /// observed by `get_item`, `contains` or `keys` yet are included. Call
    /// [`purge_expired`](Self::purge_expired) first for an exact figure.
    pub fn count(&self) -> CacheResult<usize> {
        let reader = self.read_guard()?;
        let count = self.entries(&reader).backing.count();
        Ok(count)
    }

    /// Alias of [`count`](Self::count)
    pub fn len(&self) -> CacheResult<usize> {
        self.count()
    }

    /// Check whether nothing is stored
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.count()? == 0)
    }

    /// Evaluate every entry's policies and evict the expired ones
    ///
    /// Returns the number of entries removed. This is a caller-driven sweep;
    /// the store never schedules one itself.
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let writer = self.write_guard()?;
        let now = self.clock.now();
        let mut entries = self.entries_mut(&writer);

        let candidates: Vec<String> = entries.policies.keys().cloned().collect();
        let expired = entries.expired_among(candidates, now)?;

        let removed = expired.iter().filter(|key| entries.evict(key)).count();
        self.record_expirations(removed);
        if removed > 0 {
            debug!(store = %self.config.name, removed, "purged expired entries");
        }
        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let size = self.count()?;
        Ok(self.metrics.snapshot(size))
    }

    /// Reset hit/miss/insert/removal/expiration counters to zero
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// Trade `reader` for the exclusive lock, re-check `key` and evict it if
    /// still expired
    fn evict_if_expired(&self, reader: LockReader<'_, L>, key: &str) -> CacheResult<bool> {
        drop(reader);
        let writer = self.write_guard()?;
        let now = self.clock.now();
        let mut entries = self.entries_mut(&writer);

        // Gone or replaced while no lock was held
        if !entries.backing.contains(key) || !entries.is_expired(key, now)? {
            return Ok(false);
        }

        let evicted = entries.evict(key);
        if evicted {
            self.record_expirations(1);
            debug!(store = %self.config.name, key, "evicted expired entry");
        }
        Ok(evicted)
    }

    /// Trade `reader` for the exclusive lock and evict every key in
    /// `candidates` that is still expired. Returns the candidates no longer
    /// stored afterwards, whether evicted here or removed by another thread.
    fn evict_all_expired(
        &self,
        reader: LockReader<'_, L>,
        candidates: Vec<String>,
    ) -> CacheResult<Vec<String>> {
        drop(reader);
        let writer = self.write_guard()?;
        let now = self.clock.now();
        let mut entries = self.entries_mut(&writer);

        let present: Vec<String> =
            candidates.iter().filter(|key| entries.backing.contains(key)).cloned().collect();
        let expired = entries.expired_among(present, now)?;
        let evicted: Vec<String> = expired.into_iter().filter(|key| entries.evict(key)).collect();

        self.record_expirations(evicted.len());
        for key in &evicted {
            debug!(store = %self.config.name, key = %key, "evicted expired entry");
        }
        Ok(candidates.into_iter().filter(|key| !entries.backing.contains(key)).collect())
    }

    fn read_guard(&self) -> CacheResult<LockReader<'_, L>> {
        Ok(LockReader::with_timeout(&*self.lock, self.config.lock_timeout)?)
    }

    fn write_guard(&self) -> CacheResult<LockWriter<'_, L>> {
        Ok(LockWriter::with_timeout(&*self.lock, self.config.lock_timeout)?)
    }

    /// Entries for reading; requires a held reader
    fn entries(&self, _held: &LockReader<'_, L>) -> RwLockReadGuard<'_, Entries<V>> {
        self.entries.read()
    }

    /// Entries for writing; requires a held writer
    fn entries_mut(&self, _held: &LockWriter<'_, L>) -> RwLockWriteGuard<'_, Entries<V>> {
        self.entries.write()
    }

    fn record_hit(&self, key: &str) {
        trace!(store = %self.config.name, key, "cache hit");
        if self.config.track_metrics {
            self.metrics.record_hit();
        }
    }

    fn record_miss(&self, key: &str) {
        trace!(store = %self.config.name, key, "cache miss");
        if self.config.track_metrics {
            self.metrics.record_miss();
        }
    }

    fn record_expirations(&self, count: usize) {
        if self.config.track_metrics && count > 0 {
            self.metrics.record_expirations(count as u64);
        }
    }
}

impl<V, C, L> fmt::Debug for ExpirationCacheStore<V, C, L>
where
    C: Clock,
    L: RawReaderWriter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationCacheStore")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
