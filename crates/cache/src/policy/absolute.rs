use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::ExpirationPolicy;
use crate::error::PolicyError;

/// Expires at a fixed point in time; reads never extend it
#[derive(Debug)]
pub struct AbsoluteExpirationPolicy {
    /// Set for relative policies; the deadline is recomputed on attach
    ttl: Option<Duration>,
    /// `None` when the deadline is beyond what `Instant` can represent
    deadline: Mutex<Option<Instant>>,
}

impl AbsoluteExpirationPolicy {
    /// Expire at `deadline`
    pub fn at(deadline: Instant) -> Self {
        Self { ttl: None, deadline: Mutex::new(Some(deadline)) }
    }

    /// Expire `ttl` after the entry is added
    pub fn after(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), deadline: Mutex::new(Instant::now().checked_add(ttl)) }
    }

    /// Current deadline, if representable
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.lock()
    }
}

impl ExpirationPolicy for AbsoluteExpirationPolicy {
    fn name(&self) -> &'static str {
        "absolute"
    }

    fn on_attach(&self, _key: &str, now: Instant) {
        if let Some(ttl) = self.ttl {
            *self.deadline.lock() = now.checked_add(ttl);
        }
    }

    fn has_expired(&self, _key: &str, now: Instant) -> Result<bool, PolicyError> {
        Ok(self.deadline().is_some_and(|deadline| now >= deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_deadline() {
        let start = Instant::now();
        let policy = AbsoluteExpirationPolicy::at(start + Duration::from_secs(10));

        policy.on_attach("k", start + Duration::from_secs(5));
        assert_eq!(policy.deadline(), Some(start + Duration::from_secs(10)));
        assert!(!policy.has_expired("k", start + Duration::from_secs(9)).unwrap());
        assert!(policy.has_expired("k", start + Duration::from_secs(10)).unwrap());
    }

    #[test]
    fn test_relative_deadline_starts_on_attach() {
        let start = Instant::now();
        let policy = AbsoluteExpirationPolicy::after(Duration::from_secs(3));

        policy.on_attach("k", start + Duration::from_secs(60));
        assert!(!policy.has_expired("k", start + Duration::from_secs(62)).unwrap());
        assert!(policy.has_expired("k", start + Duration::from_secs(63)).unwrap());
    }

    #[test]
    fn test_access_does_not_extend() {
        let start = Instant::now();
        let policy = AbsoluteExpirationPolicy::after(Duration::from_secs(1));
        policy.on_attach("k", start);

        policy.on_access("k", start + Duration::from_millis(900));
        assert!(policy.has_expired("k", start + Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_unrepresentable_deadline_never_expires() {
        let policy = AbsoluteExpirationPolicy::after(Duration::MAX);
        assert_eq!(policy.deadline(), None);
        assert!(!policy.has_expired("k", Instant::now()).unwrap());
    }
}
