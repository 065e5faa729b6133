//! Generic thread-safe cache with pluggable expiration policies.
//!
//! Values are kept by string key in a pluggable backing store and stay valid
//! until one of the expiration policies attached to them says otherwise.
//! Expiration is evaluated lazily on access; there are no background timers.
//!
//! # Modules
//!
//! - **[`cache`]**: the [`ExpirationCacheStore`], its configuration,
//!   statistics and the process-wide [`StoreSlot`]
//! - **[`policy`]**: the [`ExpirationPolicy`] contract and the sliding,
//!   absolute and dependency policies
//! - **[`store`]**: the [`BackingStore`] contract, [`MemoryStore`] and (with
//!   the `host-cache` feature) [`HostCacheStore`](store::HostCacheStore)
//! - **[`sync`]**: the reader/writer lock and its scoped guards
//! - **[`time`]**: clock abstraction for deterministic tests
//! - **[`error`]**: error taxonomy and classification
//! - **`testing`**: test doubles for policies and backing stores (`test-utils`
//!   feature)
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use expiration_cache::{ExpirationCacheStore, SlidingExpirationPolicy, StoreConfig};
//!
//! let store: ExpirationCacheStore<String> = ExpirationCacheStore::new(StoreConfig::named("sessions"));
//!
//! store.add_with_policies(
//!     "session:42",
//!     "token".to_string(),
//!     SlidingExpirationPolicy::new(Duration::from_secs(900)),
//! )?;
//!
//! let token = store.get_item_with("session:42", || "fresh".to_string())?;
//! assert_eq!(token, "token");
//! # Ok::<(), expiration_cache::CacheError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cache;
pub mod error;
pub mod policy;
pub mod store;
pub mod sync;
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
pub use cache::{CacheStats, ExpirationCacheStore, StoreConfig, StoreConfigBuilder, StoreSlot};
pub use error::{
    CacheError, CacheResult, ErrorClassification, ErrorSeverity, LockError, LockResult,
    PolicyError,
};
pub use policy::{
    AbsoluteExpirationPolicy, ChangeMonitor, DependencyExpirationPolicy, ExpirationPolicy,
    PolicySet, SlidingExpirationPolicy,
};
pub use store::{BackingStore, MemoryStore};
pub use sync::{LockMode, LockReader, LockWriter, RawReaderWriter, ReaderWriterLock};
pub use time::{Clock, MockClock, SystemClock};
