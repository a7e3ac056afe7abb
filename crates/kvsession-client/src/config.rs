//! Configuration shared by key-value client adapters.

use std::time::Duration;

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default connection string, the standard memcached endpoint.
pub const DEFAULT_SERVER: &str = "127.0.0.1:11211";

/// Configuration for a key-value client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Opaque connection string (address list, collection name, ...).
    pub server: String,

    /// Deadline applied to every backend call. Zero disables the deadline.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection string.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Set the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
