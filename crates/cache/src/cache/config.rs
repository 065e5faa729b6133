//! Store configuration and builder
//!
//! This module provides the configuration for an
//! [`ExpirationCacheStore`](super::ExpirationCacheStore): its name (used in
//! log events), the lock acquisition timeout, and whether to collect
//! hit/miss statistics.

use std::time::Duration;

/// Configuration for cache store behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name reported in log events
    pub name: String,

    /// Timeout for every lock acquisition the store performs (None = wait
    /// indefinitely)
    pub lock_timeout: Option<Duration>,

    /// Whether to collect hit/miss/expiration counters
    pub track_metrics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { name: "cache".to_string(), lock_timeout: None, track_metrics: false }
    }
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Quick preset for a named store with default settings
    ///
    /// # Example
    /// ```
    /// use expiration_cache::cache::StoreConfig;
    ///
    /// let config = StoreConfig::named("method-cache");
    /// assert_eq!(config.name, "method-cache");
    /// assert_eq!(config.lock_timeout, None);
    /// ```
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Quick preset for a store whose lock waits are bounded
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use expiration_cache::cache::StoreConfig;
    ///
    /// let config = StoreConfig::with_lock_timeout(Duration::from_millis(250));
    /// assert_eq!(config.lock_timeout, Some(Duration::from_millis(250)));
    /// ```
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self { lock_timeout: Some(timeout), ..Self::default() }
    }
}

/// Builder for StoreConfig with fluent API
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bound every lock acquisition by `timeout`
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely for locks (the default)
    pub fn wait_indefinitely(mut self) -> Self {
        self.config.lock_timeout = None;
        self
    }

    /// Enable or disable metrics tracking
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        self.config
    }
}
