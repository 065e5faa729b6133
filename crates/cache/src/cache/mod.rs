//! Thread-safe cache store with per-entry expiration policies
//!
//! This module provides the [`ExpirationCacheStore`], which ties together a
//! [`BackingStore`](crate::store::BackingStore) (where values live), a set of
//! [`ExpirationPolicy`](crate::policy::ExpirationPolicy) objects per key (when
//! values stop being valid) and one reader/writer lock (who may look at them).
//!
//! # Features
//!
//! - **Thread-safe**: one reader/writer lock per store; readers run in
//!   parallel, writers are exclusive
//! - **Lazy expiration**: policies are evaluated on access; no timers
//! - **Pluggable storage**: in-memory map or a host cache service
//! - **Metrics tracking**: optional hit/miss/expiration statistics
//! - **Testable**: clock abstraction for deterministic time-based testing
//!
//! # Examples
//!
//! ## Sliding expiration
//! ```
//! use std::time::Duration;
//!
//! use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
//! use expiration_cache::policy::SlidingExpirationPolicy;
//! use expiration_cache::time::MockClock;
//! use expiration_cache::store::MemoryStore;
//!
//! let clock = MockClock::new();
//! let store =
//!     ExpirationCacheStore::with_clock(StoreConfig::default(), MemoryStore::new(), clock.clone());
//!
//! store.add_with_policies("k", 1, SlidingExpirationPolicy::new(Duration::from_secs(2)))?;
//! clock.advance(Duration::from_millis(1500));
//! assert_eq!(store.get_item("k")?, Some(1)); // renews the window
//! clock.advance(Duration::from_millis(1500));
//! assert_eq!(store.get_item("k")?, Some(1));
//! clock.advance(Duration::from_secs(3));
//! assert_eq!(store.get_item("k")?, None);
//! # Ok::<(), expiration_cache::error::CacheError>(())
//! ```
//!
//! ## Combined policies with a shared dependency
//! ```
//! use std::time::Duration;
//!
//! use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
//! use expiration_cache::policy::{AbsoluteExpirationPolicy, ChangeMonitor, PolicySet};
//!
//! let schema_changed = ChangeMonitor::new();
//! let store: ExpirationCacheStore<&str> = ExpirationCacheStore::new(StoreConfig::default());
//!
//! for table in ["users", "orders"] {
//!     let policies = PolicySet::new()
//!         .with(AbsoluteExpirationPolicy::after(Duration::from_secs(600)))
//!         .with(schema_changed.policy());
//!     store.add_with_policies(table, "columns", policies)?;
//! }
//!
//! schema_changed.signal();
//! assert!(store.keys()?.is_empty());
//! # Ok::<(), expiration_cache::error::CacheError>(())
//! ```
//!
//! ## Cache Statistics
//! ```
//! use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
//!
//! let config = StoreConfig::builder().name("lookups").track_metrics(true).build();
//! let store: ExpirationCacheStore<i32> = ExpirationCacheStore::new(config);
//!
//! store.add("a", 1)?;
//! store.get_item("a")?;
//! store.get_item("b")?;
//!
//! let stats = store.stats()?;
//! assert_eq!(stats.hits, 1);
//! assert_eq!(stats.misses, 1);
//! assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
//! # Ok::<(), expiration_cache::error::CacheError>(())
//! ```

mod config;
mod core;
mod global;
mod stats;

pub use config::{StoreConfig, StoreConfigBuilder};
pub use self::core::ExpirationCacheStore;
pub use global::StoreSlot;
pub use stats::CacheStats;
