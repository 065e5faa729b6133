//! Time abstraction for testability
//!
//! The cache store reads the current instant from a [`Clock`] once per
//! operation and hands it to every policy it evaluates. Production code uses
//! [`SystemClock`]; tests use [`MockClock`] to move time forward without
//! sleeping, which makes sliding and absolute expiration deterministic.
//!
//! Lock timeouts are not routed through the clock: a blocked thread always
//! waits in real time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Trait for time operations to enable deterministic testing
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient cloning
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a test can keep one handle and give
/// another to the store:
///
/// ```
/// use std::time::Duration;
///
/// use expiration_cache::time::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let handle = clock.clone();
/// let before = clock.now();
/// handle.advance(Duration::from_secs(5));
/// assert_eq!(clock.now() - before, Duration::from_secs(5));
/// ```
///
/// Elapsed time is capped at the furthest instant the platform can represent,
/// so advancing by `Duration::MAX` parks the clock in the far future.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self::with_current_time(Instant::now())
    }

    /// Create a new mock clock with a specific start time
    pub fn with_current_time(start: Instant) -> Self {
        Self { start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed = self.representable(elapsed.saturating_add(duration));
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = self.representable(duration);
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Largest offset not beyond `elapsed` that still yields an `Instant`
    fn representable(&self, elapsed: Duration) -> Duration {
        if self.start.checked_add(elapsed).is_some() {
            return elapsed;
        }
        let (mut lo, mut hi) = (0_u64, elapsed.as_secs());
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if self.start.checked_add(Duration::from_secs(mid)).is_some() {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Duration::from_secs(lo)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start.checked_add(self.elapsed()).unwrap_or(self.start)
    }
}
