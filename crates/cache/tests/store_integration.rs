//! Integration tests for the expiration cache store
//!
//! End-to-end scenarios over real time, policy combinations and concurrent
//! access through a shared store handle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use expiration_cache::cache::{ExpirationCacheStore, StoreConfig};
use expiration_cache::error::PolicyError;
use expiration_cache::policy::{
    AbsoluteExpirationPolicy, ChangeMonitor, ExpirationPolicy, PolicySet, SlidingExpirationPolicy,
};
use expiration_cache::store::MemoryStore;
use expiration_cache::time::{Clock, MockClock};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Verifies the basic add/read path and sliding expiration over real time.
///
/// # Test Steps
/// 1. Add a plain entry and a sliding entry with a 2 second window
/// 2. Read both immediately
/// 3. Sleep 3 seconds without touching the sliding entry
/// 4. Verify the sliding entry is gone and the count reflects the removal
#[test]
fn test_end_to_end_sliding_expiration() -> Result<()> {
    init_tracing();
    let store: ExpirationCacheStore<String> = ExpirationCacheStore::new(StoreConfig::named("e2e"));

    store.add("user:1", "Alice".to_string())?;
    assert_eq!(store.get_item("user:1")?, Some("Alice".to_string()));

    store.add_with_policies(
        "session:1",
        "token".to_string(),
        SlidingExpirationPolicy::new(Duration::from_secs(2)),
    )?;
    assert_eq!(store.get_item("session:1")?, Some("token".to_string()));
    assert_eq!(store.count()?, 2);

    thread::sleep(Duration::from_secs(3));

    assert_eq!(store.get_item("session:1")?, None);
    assert_eq!(store.count()?, 1);
    assert_eq!(store.get_item("user:1")?, Some("Alice".to_string()));
    Ok(())
}

/// Verifies that the first expired policy in a set decides.
///
/// A sliding window that keeps being renewed does not protect an entry whose
/// absolute deadline has passed.
#[test]
fn test_policy_set_or_semantics() -> Result<()> {
    let clock = MockClock::new();
    let store = ExpirationCacheStore::with_clock(StoreConfig::default(), MemoryStore::new(), clock.clone());

    let policies = PolicySet::new()
        .with(SlidingExpirationPolicy::new(Duration::from_secs(5)))
        .with(AbsoluteExpirationPolicy::after(Duration::from_secs(12)));
    store.add_with_policies("report", 7_u64, policies)?;

    for _ in 0..2 {
        clock.advance(Duration::from_secs(4));
        assert_eq!(store.get_item("report")?, Some(7));
    }

    clock.advance(Duration::from_secs(4));
    assert_eq!(store.get_item("report")?, None);
    Ok(())
}

/// Verifies absolute expiration at a fixed instant is not extended by reads.
#[test]
fn test_absolute_deadline_not_extended() -> Result<()> {
    let clock = MockClock::new();
    let store = ExpirationCacheStore::with_clock(StoreConfig::default(), MemoryStore::new(), clock.clone());
    let deadline = clock.now() + Duration::from_secs(10);

    store.add_with_policies("quote", "v1", AbsoluteExpirationPolicy::at(deadline))?;
    clock.advance(Duration::from_secs(9));
    assert!(store.contains("quote")?);
    assert_eq!(store.get_item("quote")?, Some("v1"));

    clock.advance(Duration::from_secs(1));
    assert!(!store.contains("quote")?);
    assert_eq!(store.count()?, 0);
    Ok(())
}

/// Verifies that one change signal lazily invalidates every dependent entry.
///
/// # Test Steps
/// 1. Attach three entries to one monitor and one entry to nothing
/// 2. Signal the monitor
/// 3. Verify count is still raw, then that keys() filters and evicts
/// 4. Verify an entry added after the signal is unaffected
#[test]
fn test_dependency_invalidation() -> Result<()> {
    init_tracing();
    let monitor = ChangeMonitor::new();
    let store: ExpirationCacheStore<u32> = ExpirationCacheStore::new(StoreConfig::default());

    for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
        store.add_with_policies(key, value, monitor.policy())?;
    }
    store.add("independent", 0)?;

    monitor.signal();
    assert_eq!(store.count()?, 4);
    assert_eq!(store.keys()?, vec!["independent".to_string()]);
    assert_eq!(store.count()?, 1);

    store.add_with_policies("d", 4, monitor.policy())?;
    assert_eq!(store.get_item("d")?, Some(4));
    Ok(())
}

/// Verifies lazy factory population with a fallible factory.
#[test]
fn test_try_get_item_with_propagates_factory_error() -> Result<()> {
    let store: ExpirationCacheStore<u16> = ExpirationCacheStore::new(StoreConfig::default());

    let port: u16 = store.try_get_item_with("port", || Ok::<_, anyhow::Error>("8080".parse()?))?;
    assert_eq!(port, 8080);

    let failed = store.try_get_item_with("bad", || Ok::<_, anyhow::Error>("eighty".parse()?));
    assert!(failed.is_err());
    assert!(!store.contains("bad")?);
    assert_eq!(store.keys()?, vec!["port".to_string()]);
    Ok(())
}

/// Validates concurrent readers and writers on disjoint and shared keys.
///
/// Each writer owns a key range; readers hammer every key. All operations
/// must succeed and the final contents must equal the last writes.
#[test]
fn test_concurrent_access() {
    init_tracing();
    let store: Arc<ExpirationCacheStore<usize>> =
        Arc::new(ExpirationCacheStore::new(StoreConfig::with_lock_timeout(Duration::from_secs(10))));
    let writers = 4;
    let per_writer = 50;
    let barrier = Arc::new(Barrier::new(writers * 2));
    let mut handles = vec![];

    for w in 0..writers {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..per_writer {
                let key = format!("w{w}:{i}");
                store.add(key.clone(), i).unwrap();
                store.add(key, i * 2).unwrap();
            }
        }));
    }

    for r in 0..writers {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..per_writer * 4 {
                let key = format!("w{}:{}", (r + i) % writers, i % per_writer);
                if let Some(value) = store.get_item(&key).unwrap() {
                    assert!(value == i % per_writer || value == (i % per_writer) * 2);
                }
                store.count().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.count().unwrap(), writers * per_writer);
    for w in 0..writers {
        for i in 0..per_writer {
            assert_eq!(store.get_item(&format!("w{w}:{i}")).unwrap(), Some(i * 2));
        }
    }
}

/// Policy that waits inside `has_expired` until `expected` evaluations are
/// in flight at once, giving up after a deadline
#[derive(Debug)]
struct Rendezvous {
    inside: Arc<AtomicUsize>,
    met: Arc<AtomicUsize>,
    expected: usize,
    patience: Duration,
}

impl ExpirationPolicy for Rendezvous {
    fn name(&self) -> &'static str {
        "rendezvous"
    }

    fn has_expired(&self, _key: &str, _now: Instant) -> Result<bool, PolicyError> {
        self.inside.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + self.patience;
        while Instant::now() < deadline {
            if self.inside.load(Ordering::SeqCst) >= self.expected {
                self.met.fetch_add(1, Ordering::SeqCst);
                break;
            }
            thread::yield_now();
        }
        Ok(false)
    }
}

/// Verifies that `get_item` calls on different keys evaluate policies at the
/// same time instead of queueing behind one another.
///
/// # Test Steps
/// 1. Attach a rendezvous policy to two keys, each waiting for both
///    evaluations to be in flight
/// 2. Read the two keys from two threads
/// 3. Verify each reader saw the other inside policy evaluation
#[test]
fn test_readers_on_disjoint_keys_run_in_parallel() -> Result<()> {
    init_tracing();
    let store: Arc<ExpirationCacheStore<u32>> =
        Arc::new(ExpirationCacheStore::new(StoreConfig::with_lock_timeout(Duration::from_secs(10))));
    let inside = Arc::new(AtomicUsize::new(0));
    let met = Arc::new(AtomicUsize::new(0));
    let readers = 2;

    for (key, value) in [("a", 1), ("b", 2)] {
        store.add_with_policies(
            key,
            value,
            Rendezvous {
                inside: Arc::clone(&inside),
                met: Arc::clone(&met),
                expected: readers,
                patience: Duration::from_secs(5),
            },
        )?;
    }

    let barrier = Arc::new(Barrier::new(readers));
    let handles: Vec<_> = [("a", 1), ("b", 2)]
        .into_iter()
        .map(|(key, expected)| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                assert_eq!(store.get_item(key).unwrap(), Some(expected));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(met.load(Ordering::SeqCst), readers, "readers on disjoint keys were serialized");
    Ok(())
}

/// Verifies that a reader never sees a value paired with the policies of a
/// different add for the same key.
///
/// # Test Steps
/// 1. One writer alternates the key between an "expiring" value carrying an
///    already-passed deadline and a "plain" value with no policies
/// 2. Readers call `get_item` and `contains` throughout
/// 3. Verify no reader ever gets the "expiring" value back
#[test]
fn test_value_and_policies_replaced_together() {
    init_tracing();
    let store: Arc<ExpirationCacheStore<&'static str>> =
        Arc::new(ExpirationCacheStore::new(StoreConfig::with_lock_timeout(Duration::from_secs(10))));
    store.add("k", "plain").unwrap();

    let readers = 4;
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(readers + 1));

    let writer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..500 {
                store
                    .add_with_policies("k", "expiring", AbsoluteExpirationPolicy::at(Instant::now()))
                    .unwrap();
                store.add("k", "plain").unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                while !done.load(Ordering::SeqCst) {
                    if let Some(value) = store.get_item("k").unwrap() {
                        assert_eq!(value, "plain", "value read without its own policies");
                    }
                    let _ = store.contains("k").unwrap();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_item("k").unwrap(), Some("plain"));
}
