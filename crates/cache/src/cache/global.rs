//! Process-wide store slot
//!
//! For collaborators that need one shared store without threading it through
//! constructors. Prefer passing an `Arc<ExpirationCacheStore>` explicitly;
//! a slot only adds a well-defined install/teardown lifecycle on top.
//!
//! ```
//! use std::sync::Arc;
//!
//! use expiration_cache::cache::{ExpirationCacheStore, StoreConfig, StoreSlot};
//!
//! static TYPE_NAMES: StoreSlot<String> = StoreSlot::new();
//!
//! TYPE_NAMES
//!     .install(Arc::new(ExpirationCacheStore::new(StoreConfig::named("type-names"))))
//!     .map_err(|_| "already installed")?;
//!
//! if let Some(store) = TYPE_NAMES.get() {
//!     store.add("u32", "unsigned 32-bit".to_string())?;
//! }
//! assert!(TYPE_NAMES.teardown()?);
//! assert!(TYPE_NAMES.get().is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::core::ExpirationCacheStore;
use crate::error::CacheResult;
use crate::sync::{RawReaderWriter, ReaderWriterLock};
use crate::time::{Clock, SystemClock};

/// Holder for at most one shared store
pub struct StoreSlot<V, C = SystemClock, L = ReaderWriterLock>
where
    C: Clock,
    L: RawReaderWriter,
{
    slot: RwLock<Option<Arc<ExpirationCacheStore<V, C, L>>>>,
}

impl<V, C, L> StoreSlot<V, C, L>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
    L: RawReaderWriter,
{
    /// Create an empty slot (usable in `static` items)
    pub const fn new() -> Self {
        Self { slot: parking_lot::const_rwlock(None) }
    }

    /// Install `store`
    ///
    /// Fails with the rejected store if one is already installed.
    pub fn install(
        &self,
        store: Arc<ExpirationCacheStore<V, C, L>>,
    ) -> Result<(), Arc<ExpirationCacheStore<V, C, L>>> {
        let mut slot = self.slot.write();
        if slot.is_some() {
            return Err(store);
        }

        debug!(store = %store.name(), "installed process-wide cache store");
        *slot = Some(store);
        Ok(())
    }

    /// The installed store, if any
    pub fn get(&self) -> Option<Arc<ExpirationCacheStore<V, C, L>>> {
        self.slot.read().clone()
    }

    /// Check whether a store is installed
    pub fn is_installed(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Take the installed store out of the slot and clear it
    ///
    /// Returns `false` when nothing was installed. Handles obtained through
    /// [`get`](Self::get) stay valid but see an empty store. If clearing
    /// fails the slot is already empty and the error is returned.
    pub fn teardown(&self) -> CacheResult<bool> {
        let Some(store) = self.slot.write().take() else {
            return Ok(false);
        };

        store.clear()?;
        debug!(store = %store.name(), "tore down process-wide cache store");
        Ok(true)
    }
}

impl<V, C, L> Default for StoreSlot<V, C, L>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
    L: RawReaderWriter,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C, L> fmt::Debug for StoreSlot<V, C, L>
where
    C: Clock,
    L: RawReaderWriter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSlot").field("installed", &self.slot.read().is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::global.
    use super::*;
    use crate::cache::StoreConfig;

    /// Validates the install/get/teardown lifecycle.
    ///
    /// Assertions:
    /// - A second install is rejected and hands the store back.
    /// - Teardown clears the store for handles that outlive it.
    /// - The slot can be reused after teardown.
    #[test]
    fn test_slot_lifecycle() {
        static SLOT: StoreSlot<i32> = StoreSlot::new();
        assert!(!SLOT.is_installed());
        assert!(!SLOT.teardown().unwrap());

        let first = Arc::new(ExpirationCacheStore::new(StoreConfig::named("first")));
        SLOT.install(Arc::clone(&first)).unwrap();
        assert!(SLOT.is_installed());

        let rejected = SLOT
            .install(Arc::new(ExpirationCacheStore::new(StoreConfig::named("second"))))
            .unwrap_err();
        assert_eq!(rejected.name(), "second");

        let handle = SLOT.get().unwrap();
        handle.add("a", 1).unwrap();
        assert_eq!(first.get_item("a").unwrap(), Some(1));

        assert!(SLOT.teardown().unwrap());
        assert!(SLOT.get().is_none());
        assert_eq!(handle.count().unwrap(), 0);

        SLOT.install(Arc::new(ExpirationCacheStore::new(StoreConfig::named("third")))).unwrap();
        assert_eq!(SLOT.get().unwrap().name(), "third");
    }

    /// Validates `Default` for a slot.
    #[test]
    fn test_default_slot_is_empty() {
        let slot: StoreSlot<String> = StoreSlot::default();
        assert!(slot.get().is_none());
        assert_eq!(format!("{slot:?}"), "StoreSlot { installed: false }");
    }
}
