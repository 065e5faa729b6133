//! Error types for lock coordination, policy evaluation and cache operations
//!
//! Errors are layered the same way the cache is:
//!
//! 1. **`LockError`**: raised by the reader/writer primitive and the scoped
//!    guards in [`crate::sync`]. Usable on its own by any component that only
//!    needs reader/writer coordination.
//! 2. **`PolicyError`**: raised by an [`ExpirationPolicy`] whose evaluation
//!    failed. The cache never masks it.
//! 3. **`CacheError`**: what the public cache API returns. It composes the two
//!    above transparently so callers can match on the original cause.
//!
//! A missing or expired key is never an error: lookups return `None`.
//!
//! ## ErrorClassification Trait
//!
//! Every error type implements [`ErrorClassification`] so callers can make
//! uniform retry and alerting decisions:
//!
//! | Error | Retryable | Severity |
//! |-------|-----------|----------|
//! | `LockError::Timeout` | yes | Warning |
//! | `LockError::RecursionViolation` | no | Error |
//! | `PolicyError` | no | Error |
//!
//! ```
//! use std::time::Duration;
//!
//! use expiration_cache::error::{ErrorClassification, LockError};
//! use expiration_cache::sync::LockMode;
//!
//! let err = LockError::Timeout { mode: LockMode::Shared, timeout: Duration::from_millis(100) };
//! assert!(err.is_retryable());
//! assert!(!err.is_critical());
//! ```
//!
//! [`ExpirationPolicy`]: crate::policy::ExpirationPolicy

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::sync::LockMode;

/// Result type for lock guard operations
pub type LockResult<T> = Result<T, LockError>;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while acquiring a reader/writer lock
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The lock was not granted before the timeout elapsed
    #[error("timed out after {timeout:?} waiting for {mode} lock")]
    Timeout {
        /// Mode that was requested
        mode: LockMode,
        /// How long the caller was willing to wait
        timeout: Duration,
    },

    /// The calling thread already holds the lock in a mode that cannot be
    /// extended to the requested one (e.g. exclusive while holding shared)
    #[error("{requested} lock requested while the current thread holds a {held} lock")]
    RecursionViolation {
        /// Mode that was requested
        requested: LockMode,
        /// Mode the thread already holds
        held: LockMode,
    },
}

impl LockError {
    /// Check whether this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The mode the failed acquisition asked for
    pub fn requested_mode(&self) -> LockMode {
        match self {
            Self::Timeout { mode, .. } => *mode,
            Self::RecursionViolation { requested, .. } => *requested,
        }
    }
}

/// A policy failed to decide whether an entry is still valid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expiration policy '{policy}' failed for key '{key}': {message}")]
pub struct PolicyError {
    /// Name of the failing policy
    pub policy: String,
    /// Key of the entry being evaluated
    pub key: String,
    /// What went wrong
    pub message: String,
}

impl PolicyError {
    /// Create a policy evaluation error
    pub fn new<P: Into<String>, K: Into<String>, M: Into<String>>(
        policy: P,
        key: K,
        message: M,
    ) -> Self {
        Self { policy: policy.into(), key: key.into(), message: message.into() }
    }
}

/// Errors surfaced by the cache store public API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Lock acquisition failed; the store is unchanged
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A policy raised an error; the entry is unchanged
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl CacheError {
    /// Check whether the operation failed because a lock timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Lock(err) if err.is_timeout())
    }

    /// Check whether the operation hit a lock recursion violation
    pub fn is_recursion_violation(&self) -> bool {
        matches!(self, Self::Lock(LockError::RecursionViolation { .. }))
    }
}

/// Trait for classifying errors by their operational characteristics
///
/// Implemented by every error type in this crate so that retry and alerting
/// logic can be written once against the trait.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient, such as lock contention that may clear
    /// up on a later attempt.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for LockError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::RecursionViolation { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl ErrorClassification for PolicyError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Lock(e) => e.is_retryable(),
            Self::Policy(e) => e.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Lock(e) => e.severity(),
            Self::Policy(e) => e.severity(),
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Lock(e) => e.is_critical(),
            Self::Policy(e) => e.is_critical(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Lock(e) => e.retry_after(),
            Self::Policy(e) => e.retry_after(),
        }
    }
}
