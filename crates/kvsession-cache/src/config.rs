//! Configuration for the local session cache.

use std::time::Duration;

/// Default session lifetime on the backend.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Default slack added to the TTL before a resident session is re-checked.
pub const DEFAULT_RECONCILE_BUFFER: Duration = Duration::from_secs(1);

/// Default number of reconciliation checks allowed to run at once.
pub const DEFAULT_RECONCILE_WORKERS: usize = 5;

/// Configuration for the local session cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a session record on the backend, refreshed on every save.
    pub session_ttl: Duration,

    /// Added to `session_ttl` to get the reconciliation interval.
    /// Tolerates clock skew and backend expiry latency.
    pub reconcile_buffer: Duration,

    /// Upper bound on concurrently running reconciliation checks.
    pub reconcile_workers: usize,

    /// Prepended to every session id to form the backend key.
    pub key_prefix: String,

    /// Appended to every session id to form the backend key.
    pub key_suffix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            reconcile_buffer: DEFAULT_RECONCILE_BUFFER,
            reconcile_workers: DEFAULT_RECONCILE_WORKERS,
            key_prefix: String::new(),
            key_suffix: String::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend session lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the slack added to the TTL between checks.
    pub fn with_reconcile_buffer(mut self, buffer: Duration) -> Self {
        self.reconcile_buffer = buffer;
        self
    }

    /// Set the number of concurrent reconciliation checks.
    pub fn with_reconcile_workers(mut self, workers: usize) -> Self {
        self.reconcile_workers = workers;
        self
    }

    /// Set the backend key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the backend key suffix.
    pub fn with_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = suffix.into();
        self
    }

    /// Delay between reconciliation checks of one resident session.
    pub fn reconcile_interval(&self) -> Duration {
        self.session_ttl.saturating_add(self.reconcile_buffer)
    }

    /// Backend key for a session id.
    pub fn mangle_key(&self, id: &str) -> String {
        format!("{}{}{}", self.key_prefix, id, self.key_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.reconcile_interval(), Duration::from_secs(1801));
        assert_eq!(config.reconcile_workers, 5);
        assert_eq!(config.mangle_key("abc"), "abc");
    }

    #[test]
    fn test_reconcile_interval_saturates() {
        let config = CacheConfig::new()
            .with_session_ttl(Duration::MAX)
            .with_reconcile_buffer(Duration::from_secs(1));
        assert_eq!(config.reconcile_interval(), Duration::MAX);
    }

    #[test]
    fn test_mangle_key() {
        let config = CacheConfig::new()
            .with_key_prefix("app:")
            .with_key_suffix(":v1");
        assert_eq!(config.mangle_key("abc"), "app:abc:v1");
    }
}
