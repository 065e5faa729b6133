use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::ExpirationPolicy;
use crate::error::PolicyError;

/// Expires when an entry has not been read for longer than `window`
///
/// Every successful read pushes the window out again. Until the policy is
/// attached to an entry the window is measured from construction.
#[derive(Debug)]
pub struct SlidingExpirationPolicy {
    window: Duration,
    last_touched: Mutex<Instant>,
}

impl SlidingExpirationPolicy {
    /// Create a sliding policy with the given idle window
    pub fn new(window: Duration) -> Self {
        Self { window, last_touched: Mutex::new(Instant::now()) }
    }

    /// The idle window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// When the entry was last read (or attached)
    pub fn last_touched(&self) -> Instant {
        *self.last_touched.lock()
    }
}

impl ExpirationPolicy for SlidingExpirationPolicy {
    fn name(&self) -> &'static str {
        "sliding"
    }

    fn on_attach(&self, _key: &str, now: Instant) {
        *self.last_touched.lock() = now;
    }

    fn has_expired(&self, _key: &str, now: Instant) -> Result<bool, PolicyError> {
        let idle = now.saturating_duration_since(self.last_touched());
        Ok(idle > self.window)
    }

    fn on_access(&self, _key: &str, now: Instant) {
        // Concurrent readers may report out of order; never move backwards
        let mut last_touched = self.last_touched.lock();
        if now > *last_touched {
            *last_touched = now;
        }
    }
}
