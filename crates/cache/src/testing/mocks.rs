//! Mock implementations of the policy and backing store contracts

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::PolicyError;
use crate::policy::ExpirationPolicy;
use crate::store::BackingStore;
use crate::sync::{LockMode, RawReaderWriter, ReaderWriterLock};

#[derive(Debug, Default)]
struct Script {
    expired: AtomicBool,
    failure: Mutex<Option<String>>,
    evaluations: AtomicUsize,
    accesses: AtomicUsize,
    attachments: AtomicUsize,
}

/// Expiration policy whose verdict is set by the test
///
/// Valid until [`PolicyProbe::expire`] is called. Every call into the policy
/// is counted on the probe.
#[derive(Debug)]
pub struct ScriptedPolicy {
    script: Arc<Script>,
}

/// Test-side handle of a [`ScriptedPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyProbe {
    script: Arc<Script>,
}

impl ScriptedPolicy {
    /// Create a policy and the probe controlling it
    pub fn new() -> (Self, PolicyProbe) {
        let script = Arc::new(Script::default());
        (Self { script: Arc::clone(&script) }, PolicyProbe { script })
    }
}

impl ExpirationPolicy for ScriptedPolicy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn on_attach(&self, _key: &str, _now: Instant) {
        self.script.attachments.fetch_add(1, Ordering::SeqCst);
    }

    fn has_expired(&self, key: &str, _now: Instant) -> Result<bool, PolicyError> {
        self.script.evaluations.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.script.failure.lock().as_deref() {
            return Err(PolicyError::new(self.name(), key, message));
        }
        Ok(self.script.expired.load(Ordering::SeqCst))
    }

    fn on_access(&self, _key: &str, _now: Instant) {
        self.script.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

impl PolicyProbe {
    /// Make the policy report expiration from now on
    pub fn expire(&self) {
        self.script.expired.store(true, Ordering::SeqCst);
    }

    /// Make the policy report a valid entry again
    pub fn revive(&self) {
        self.script.expired.store(false, Ordering::SeqCst);
    }

    /// Make every evaluation fail with `message`
    pub fn fail_with<S: Into<String>>(&self, message: S) {
        *self.script.failure.lock() = Some(message.into());
    }

    /// Stop injecting failures
    pub fn clear_failure(&self) {
        *self.script.failure.lock() = None;
    }

    /// Number of `has_expired` calls so far
    pub fn evaluations(&self) -> usize {
        self.script.evaluations.load(Ordering::SeqCst)
    }

    /// Number of `on_access` calls so far
    pub fn accesses(&self) -> usize {
        self.script.accesses.load(Ordering::SeqCst)
    }

    /// Number of `on_attach` calls so far
    pub fn attachments(&self) -> usize {
        self.script.attachments.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Report {
    calls: AtomicUsize,
    violations: Mutex<Vec<String>>,
}

/// Backing store wrapper that checks the calling thread's hold on a lock
///
/// Reads must happen under at least a shared hold and mutations under an
/// exclusive hold. Anything else is recorded on the [`AccessReport`].
#[derive(Debug)]
pub struct GuardedStore<S, L = ReaderWriterLock> {
    inner: S,
    lock: Arc<L>,
    report: Arc<Report>,
}

/// Test-side view of a [`GuardedStore`]'s findings
#[derive(Debug, Clone)]
pub struct AccessReport {
    report: Arc<Report>,
}

impl<S, L: RawReaderWriter> GuardedStore<S, L> {
    /// Wrap `inner`, checking holds on `lock`
    pub fn new(inner: S, lock: Arc<L>) -> (Self, AccessReport) {
        let report = Arc::new(Report::default());
        (Self { inner, lock, report: Arc::clone(&report) }, AccessReport { report })
    }

    fn check_read(&self, operation: &str) {
        self.report.calls.fetch_add(1, Ordering::SeqCst);
        if self.lock.held_mode().is_none() {
            self.violation(operation, None);
        }
    }

    fn check_write(&self, operation: &str) {
        self.report.calls.fetch_add(1, Ordering::SeqCst);
        let held = self.lock.held_mode();
        if held != Some(LockMode::Exclusive) {
            self.violation(operation, held);
        }
    }

    fn violation(&self, operation: &str, held: Option<LockMode>) {
        let held = held.map_or_else(|| "no".to_string(), |mode| mode.to_string());
        self.report.violations.lock().push(format!("{operation} called with {held} lock"));
    }
}

impl<V, S, L> BackingStore<V> for GuardedStore<S, L>
where
    S: BackingStore<V>,
    L: RawReaderWriter,
{
    fn insert(&mut self, key: String, value: V) {
        self.check_write("insert");
        self.inner.insert(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.check_read("contains");
        self.inner.contains(key)
    }

    fn read(&self, key: &str) -> Option<V> {
        self.check_read("read");
        self.inner.read(key)
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.check_write("remove");
        self.inner.remove(key)
    }

    fn read_keys(&self) -> Vec<String> {
        self.check_read("read_keys");
        self.inner.read_keys()
    }

    fn clear(&mut self) {
        self.check_write("clear");
        self.inner.clear();
    }

    fn count(&self) -> usize {
        self.check_read("count");
        self.inner.count()
    }
}

impl AccessReport {
    /// Number of backing store calls observed
    pub fn calls(&self) -> usize {
        self.report.calls.load(Ordering::SeqCst)
    }

    /// Descriptions of calls made without the required hold
    pub fn violations(&self) -> Vec<String> {
        self.report.violations.lock().clone()
    }
}
