//! Testing utilities and helpers
//!
//! Test doubles for code built on the cache store:
//! - **[`mocks`]**: [`ScriptedPolicy`] (an expiration policy driven from the
//!   test through a [`PolicyProbe`]) and [`GuardedStore`] (a backing store
//!   wrapper that reports accesses made without the right lock held)
//!
//! Time control lives in [`crate::time::MockClock`].
//!
//! ## Usage
//!
//! ```rust
//! use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
//! use expiration_cache::testing::ScriptedPolicy;
//!
//! let store: ExpirationCacheStore<u32> = ExpirationCacheStore::new(StoreConfig::default());
//! let (policy, probe) = ScriptedPolicy::new();
//! store.add_with_policies("k", 1, policy)?;
//!
//! assert_eq!(store.get_item("k")?, Some(1));
//! probe.expire();
//! assert_eq!(store.get_item("k")?, None);
//! # Ok::<(), expiration_cache::error::CacheError>(())
//! ```

pub mod mocks;

pub use mocks::{AccessReport, GuardedStore, PolicyProbe, ScriptedPolicy};
