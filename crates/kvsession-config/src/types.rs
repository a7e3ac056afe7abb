//! Configuration types.
//!
//! ```toml
//! [client]
//! backend = "memory"
//! server = "127.0.0.1:11211"
//! timeout_ms = 1000
//!
//! [cache]
//! session_ttl_secs = 1800
//! reconcile_buffer_ms = 1000
//! reconcile_workers = 5
//! key_prefix = ""
//! key_suffix = ""
//!
//! [metrics]
//! enabled = true
//! category = "SessionClustering"
//! ```

use std::time::Duration;

use kvsession_cache::CacheConfig;
use kvsession_client::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Root configuration.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvsessionConfig {
    /// Backend client configuration.
    pub client: Option<ClientSection>,

    /// Local cache configuration.
    pub cache: Option<CacheSection>,

    /// Metrics configuration.
    pub metrics: Option<MetricsSection>,
}

impl KvsessionConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: KvsessionConfig) {
        if other.client.is_some() {
            self.client = other.client;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.metrics.is_some() {
            self.metrics = other.metrics;
        }
    }

    /// Client section, or defaults.
    pub fn client(&self) -> ClientSection {
        self.client.clone().unwrap_or_default()
    }

    /// Cache section, or defaults.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Metrics section, or defaults.
    pub fn metrics(&self) -> MetricsSection {
        self.metrics.clone().unwrap_or_default()
    }

    /// Reject values that would make the cache unusable.
    pub fn validate(&self) -> Result<()> {
        let cache = self.cache();
        if cache.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.session_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if cache.session_ttl_secs > i32::MAX as u64 {
            return Err(ConfigError::Invalid {
                field: "cache.session_ttl_secs",
                reason: format!("must be at most {} seconds", i32::MAX),
            });
        }
        if cache.reconcile_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.reconcile_workers",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.metrics().category.contains(':') {
            return Err(ConfigError::Invalid {
                field: "metrics.category",
                reason: "must not contain ':'".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Supported backend adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process hash map.
    #[default]
    Memory,
    /// Document collection with unique and TTL indexes.
    Document,
}

impl BackendKind {
    /// Name used as the metrics `type` segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Document => "document",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(BackendKind::Memory),
            "document" => Ok(BackendKind::Document),
            other => Err(ConfigError::Invalid {
                field: "client.backend",
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Backend client section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Which adapter to use.
    pub backend: BackendKind,
    /// Connection string.
    pub server: String,
    /// Per-call deadline in milliseconds; 0 disables it.
    pub timeout_ms: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            server: kvsession_client::DEFAULT_SERVER.to_string(),
            timeout_ms: kvsession_client::DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientSection {
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_server(self.server.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Local cache section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Backend session lifetime in seconds.
    pub session_ttl_secs: u64,
    /// Slack added to the TTL between reconciliation checks, in milliseconds.
    pub reconcile_buffer_ms: u64,
    /// Concurrent reconciliation checks.
    pub reconcile_workers: usize,
    /// Backend key prefix.
    pub key_prefix: String,
    /// Backend key suffix.
    pub key_suffix: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            session_ttl_secs: kvsession_cache::DEFAULT_SESSION_TTL.as_secs(),
            reconcile_buffer_ms: kvsession_cache::DEFAULT_RECONCILE_BUFFER.as_millis() as u64,
            reconcile_workers: kvsession_cache::DEFAULT_RECONCILE_WORKERS,
            key_prefix: String::new(),
            key_suffix: String::new(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_session_ttl(Duration::from_secs(self.session_ttl_secs))
            .with_reconcile_buffer(Duration::from_millis(self.reconcile_buffer_ms))
            .with_reconcile_workers(self.reconcile_workers)
            .with_key_prefix(self.key_prefix.clone())
            .with_key_suffix(self.key_suffix.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Metrics section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    /// Whether to wrap the client with instrumentation.
    pub enabled: bool,
    /// First segment of the metrics name.
    pub category: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            category: kvsession_metrics::DEFAULT_CATEGORY.to_string(),
        }
    }
}
