use moka::sync::Cache;

use super::BackingStore;

/// Store adapting a host-provided concurrent cache service
///
/// The host cache (a `moka::sync::Cache`) may be shared with other parts of
/// the process. This adapter only uses it as a key/value medium: entries are
/// inserted without time-to-live, time-to-idle or capacity bounds, because
/// expiration belongs to the owning cache store. `count` and `read_keys`
/// walk the host's iteration surface rather than its approximate entry
/// count, so they reflect removals immediately.
///
/// ```
/// use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
/// use expiration_cache::store::HostCacheStore;
///
/// let host = moka::sync::Cache::builder().build();
/// let store = ExpirationCacheStore::with_store(
///     StoreConfig::named("tokens"),
///     HostCacheStore::from_host(host.clone()),
/// );
///
/// store.add("user:1", "Alice".to_string())?;
/// assert_eq!(host.get("user:1"), Some("Alice".to_string()));
/// # Ok::<(), expiration_cache::error::CacheError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HostCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    host: Cache<String, V>,
}

impl<V> HostCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store over a fresh, unbounded host cache
    pub fn new() -> Self {
        Self { host: Cache::builder().build() }
    }

    /// Adapt an existing host cache
    ///
    /// The host should be built without expiration settings; any it has
    /// would evict entries behind the cache store's back.
    pub fn from_host(host: Cache<String, V>) -> Self {
        Self { host }
    }

    /// The underlying host cache
    pub fn host(&self) -> &Cache<String, V> {
        &self.host
    }
}

impl<V> Default for HostCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> BackingStore<V> for HostCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn insert(&mut self, key: String, value: V) {
        self.host.insert(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.host.contains_key(key)
    }

    fn read(&self, key: &str) -> Option<V> {
        self.host.get(key)
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.host.remove(key)
    }

    fn read_keys(&self) -> Vec<String> {
        self.host.iter().map(|(key, _)| (*key).clone()).collect()
    }

    fn clear(&mut self) {
        for key in self.read_keys() {
            self.host.invalidate(&key);
        }
        self.host.run_pending_tasks();
    }

    fn count(&self) -> usize {
        self.host.iter().count()
    }
}
