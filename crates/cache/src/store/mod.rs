//! Backing store contract and implementations
//!
//! A [`BackingStore`] is the physical key/value medium behind a cache store.
//! It provides primitive storage only: no locking and no expiration. The
//! [`ExpirationCacheStore`](crate::cache::ExpirationCacheStore) calls it while
//! holding the appropriate guard (shared for `&self` methods, exclusive for
//! `&mut self` methods) and performs all policy evaluation itself.
//!
//! Provided stores:
//! - **[`MemoryStore`]**: in-process `HashMap`
//! - **[`HostCacheStore`]** (feature `host-cache`): adapter over a
//!   host-provided concurrent cache service (`moka`), with the host's own
//!   expiration features left unused
//!
//! Plugging in a new medium means implementing exactly this trait.

#[cfg(feature = "host-cache")]
mod host;
mod memory;

#[cfg(feature = "host-cache")]
pub use host::HostCacheStore;
pub use memory::MemoryStore;

/// Primitive storage operations every physical store provides
pub trait BackingStore<V>: Send + Sync {
    /// Insert or replace the value for `key`
    fn insert(&mut self, key: String, value: V);

    /// Check whether `key` is stored
    fn contains(&self, key: &str) -> bool;

    /// Read a copy of the value for `key`
    fn read(&self, key: &str) -> Option<V>;

    /// Remove `key`, returning its value if it was stored
    fn remove(&mut self, key: &str) -> Option<V>;

    /// All stored keys, in no particular order
    fn read_keys(&self) -> Vec<String>;

    /// Remove every entry
    fn clear(&mut self);

    /// Number of stored entries
    fn count(&self) -> usize;

    /// Check whether nothing is stored
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl<V, S: BackingStore<V> + ?Sized> BackingStore<V> for Box<S> {
    fn insert(&mut self, key: String, value: V) {
        (**self).insert(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }

    fn read(&self, key: &str) -> Option<V> {
        (**self).read(key)
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        (**self).remove(key)
    }

    fn read_keys(&self) -> Vec<String> {
        (**self).read_keys()
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn count(&self) -> usize {
        (**self).count()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}
