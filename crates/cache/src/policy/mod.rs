//! Expiration policies
//!
//! An [`ExpirationPolicy`] decides, for one entry, whether it is still valid.
//! The cache store owns the policies attached to each key and drives them:
//!
//! 1. `on_attach` when the entry is added (starts relative clocks)
//! 2. `has_expired` on every read, `contains` and `keys` check
//! 3. `on_access` after a successful read (sliding renewal)
//!
//! Policies receive `now` from the store's [`Clock`](crate::time::Clock); they
//! never read the wall clock themselves, which keeps them testable with
//! [`MockClock`](crate::time::MockClock).
//!
//! # Combining policies
//!
//! A [`PolicySet`] combines policies with logical OR: the entry is expired
//! as soon as one policy says so. An empty set never expires.
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use expiration_cache::policy::{AbsoluteExpirationPolicy, PolicySet, SlidingExpirationPolicy};
//!
//! let start = Instant::now();
//! let policies = PolicySet::new()
//!     .with(SlidingExpirationPolicy::new(Duration::from_secs(60)))
//!     .with(AbsoluteExpirationPolicy::after(Duration::from_secs(300)));
//! policies.attach("session:1", start);
//!
//! assert!(!policies.is_expired("session:1", start + Duration::from_secs(30))?);
//! assert!(policies.is_expired("session:1", start + Duration::from_secs(61))?);
//! # Ok::<(), expiration_cache::error::PolicyError>(())
//! ```

mod absolute;
mod dependency;
mod sliding;

use std::fmt;
use std::time::Instant;

pub use absolute::AbsoluteExpirationPolicy;
pub use dependency::{ChangeMonitor, DependencyExpirationPolicy};
pub use sliding::SlidingExpirationPolicy;

use crate::error::PolicyError;

/// Rule deciding whether a cache entry is still valid
///
/// Implementations are shared between concurrent readers (the store calls
/// them while holding a shared lock), so any state they keep must use
/// interior mutability. They must not block.
pub trait ExpirationPolicy: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Called once when the policy is associated with `key`
    fn on_attach(&self, _key: &str, _now: Instant) {}

    /// Whether the entry for `key` is no longer valid at `now`
    ///
    /// Must not mutate anything outside the policy's own state. An error
    /// aborts the cache operation and leaves the entry as it was.
    fn has_expired(&self, key: &str, now: Instant) -> Result<bool, PolicyError>;

    /// Called once per successful read of a valid entry
    fn on_access(&self, _key: &str, _now: Instant) {}
}

/// Ordered set of policies attached to one entry
#[derive(Debug, Default)]
pub struct PolicySet {
    policies: Vec<Box<dyn ExpirationPolicy>>,
}

impl PolicySet {
    /// Create an empty set (never expires)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy (builder style)
    pub fn with<P: ExpirationPolicy + 'static>(mut self, policy: P) -> Self {
        self.push(policy);
        self
    }

    /// Add a policy
    pub fn push<P: ExpirationPolicy + 'static>(&mut self, policy: P) {
        self.policies.push(Box::new(policy));
    }

    /// Add an already boxed policy
    pub fn push_boxed(&mut self, policy: Box<dyn ExpirationPolicy>) {
        self.policies.push(policy);
    }

    /// Number of policies
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check whether the set is empty, i.e. never expires
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Iterate over the policies in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn ExpirationPolicy> + '_ {
        self.policies.iter().map(|policy| policy.as_ref())
    }

    /// Notify every policy that it now guards `key`
    pub fn attach(&self, key: &str, now: Instant) {
        for policy in &self.policies {
            policy.on_attach(key, now);
        }
    }

    /// OR of all policies; stops at the first that reports expiration
    ///
    /// When the entry is valid every policy has been asked.
    pub fn is_expired(&self, key: &str, now: Instant) -> Result<bool, PolicyError> {
        for policy in &self.policies {
            if policy.has_expired(key, now)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Record a successful read on every policy
    pub fn touch(&self, key: &str, now: Instant) {
        for policy in &self.policies {
            policy.on_access(key, now);
        }
    }
}

impl<P: ExpirationPolicy + 'static> From<P> for PolicySet {
    fn from(policy: P) -> Self {
        Self::new().with(policy)
    }
}

impl From<Vec<Box<dyn ExpirationPolicy>>> for PolicySet {
    fn from(policies: Vec<Box<dyn ExpirationPolicy>>) -> Self {
        Self { policies }
    }
}

impl FromIterator<Box<dyn ExpirationPolicy>> for PolicySet {
    fn from_iter<I: IntoIterator<Item = Box<dyn ExpirationPolicy>>>(iter: I) -> Self {
        Self { policies: iter.into_iter().collect() }
    }
}
