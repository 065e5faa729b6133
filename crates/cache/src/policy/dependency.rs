use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::ExpirationPolicy;
use crate::error::PolicyError;

/// Shared change signal that entries can depend on
///
/// Clones share the signal. Signalling invalidates every entry whose
/// [`DependencyExpirationPolicy`] was attached before the signal; entries are
/// still evicted lazily on their next access.
///
/// ```
/// use std::time::Instant;
///
/// use expiration_cache::policy::{ChangeMonitor, ExpirationPolicy};
///
/// let config_changed = ChangeMonitor::new();
/// let policy = config_changed.policy();
/// policy.on_attach("settings", Instant::now());
///
/// assert!(!policy.has_expired("settings", Instant::now())?);
/// config_changed.signal();
/// assert!(policy.has_expired("settings", Instant::now())?);
/// # Ok::<(), expiration_cache::error::PolicyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeMonitor {
    generation: Arc<AtomicU64>,
}

impl ChangeMonitor {
    /// Create an unsignalled monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change of the underlying dependency
    pub fn signal(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of changes signalled so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Create a policy bound to this monitor
    pub fn policy(&self) -> DependencyExpirationPolicy {
        DependencyExpirationPolicy::new(self.clone())
    }
}

/// Expires once its [`ChangeMonitor`] is signalled after attachment
#[derive(Debug)]
pub struct DependencyExpirationPolicy {
    monitor: ChangeMonitor,
    observed: AtomicU64,
}

impl DependencyExpirationPolicy {
    /// Create a policy that watches `monitor`
    pub fn new(monitor: ChangeMonitor) -> Self {
        let observed = AtomicU64::new(monitor.generation());
        Self { monitor, observed }
    }
}

impl ExpirationPolicy for DependencyExpirationPolicy {
    fn name(&self) -> &'static str {
        "dependency"
    }

    fn on_attach(&self, _key: &str, _now: Instant) {
        self.observed.store(self.monitor.generation(), Ordering::Release);
    }

    fn has_expired(&self, _key: &str, _now: Instant) -> Result<bool, PolicyError> {
        Ok(self.monitor.generation() != self.observed.load(Ordering::Acquire))
    }
}
