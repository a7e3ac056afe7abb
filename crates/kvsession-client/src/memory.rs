//! In-process adapter backed by a shared hash map.
//!
//! [`MemoryStore`] is an explicitly constructed store: clone it to share one
//! backend between several clients (simulating several processes) and keep a
//! handle in the test harness to inspect or tamper with records.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::deadline::with_deadline;
use crate::error::{ClientError, Result};
use crate::lifecycle::LifecycleCell;
use crate::store::{Lifecycle, VersionedStore};
use crate::ttl::Ttl;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Opaque payload. `None` when only metadata was ever written.
    pub payload: Option<Vec<u8>>,

    /// Caller-supplied version.
    pub version: i64,

    /// Absolute expiry, `None` for forever.
    pub expires_at: Option<SystemTime>,
}

impl StoreEntry {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

struct StoreInner {
    entries: Mutex<HashMap<String, StoreEntry>>,
    clock: Arc<dyn Clock>,
    latency_micros: AtomicU64,
    unavailable: AtomicBool,
}

/// Shared in-memory record store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.inner.entries.lock().len())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that evaluates expiry against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(HashMap::new()),
                clock,
                latency_micros: AtomicU64::new(0),
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// The clock used for expiry.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Number of records, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Peek at a live record without going through a client.
    pub fn entry(&self, key: &str) -> Option<StoreEntry> {
        let now = self.inner.clock.now();
        self.inner
            .entries
            .lock()
            .get(key)
            .filter(|e| !e.is_expired(now))
            .cloned()
    }

    /// Write a record directly, bypassing any client. Used to simulate
    /// another process updating the backend.
    pub fn put(&self, key: impl Into<String>, entry: StoreEntry) {
        self.inner.entries.lock().insert(key.into(), entry);
    }

    /// Drop every expired record and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired records");
        }
        purged
    }

    /// Delay every backend call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_micros
            .store(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Make every backend call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::Relaxed);
    }

    async fn round_trip(&self) -> Result<()> {
        let latency = self.inner.latency_micros.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_micros(latency)).await;
        }
        if self.inner.unavailable.load(Ordering::Relaxed) {
            return Err(ClientError::connection(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory store unavailable",
            )));
        }
        Ok(())
    }

    /// Run `f` over the live entries map, purging `key` first if it expired.
    fn with_live<T>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, StoreEntry>) -> T) -> T {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.lock();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            trace!(key = %key, "Dropping expired record");
            entries.remove(key);
        }
        f(&mut entries)
    }
}

/// Key-value client over a [`MemoryStore`].
pub struct MemoryClient {
    store: MemoryStore,
    config: ClientConfig,
    lifecycle: LifecycleCell,
    connections: AtomicU64,
}

impl MemoryClient {
    /// Create a client over `store` with default configuration.
    pub fn new(store: MemoryStore) -> Self {
        Self::with_config(store, ClientConfig::default())
    }

    /// Create a client over `store`.
    pub fn with_config(store: MemoryStore, config: ClientConfig) -> Self {
        Self {
            store,
            config,
            lifecycle: LifecycleCell::new(),
            connections: AtomicU64::new(0),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// How many times a connection has been opened.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    async fn call<T: Send>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&MemoryStore) -> T + Send,
    ) -> Result<T> {
        self.lifecycle.ensure_established()?;
        with_deadline(operation, self.config.timeout, async {
            self.store.round_trip().await?;
            Ok::<_, ClientError>(f(&self.store))
        })
        .await
    }
}

#[async_trait]
impl Lifecycle for MemoryClient {
    async fn establish(&self) -> Result<()> {
        if self.lifecycle.is_established() {
            info!(server = %self.config.server, "Re-establishing memory client");
            self.lifecycle.mark_shut_down();
        }
        with_deadline("establish", self.config.timeout, self.store.round_trip()).await?;
        self.connections.fetch_add(1, Ordering::Relaxed);
        self.lifecycle.mark_established();
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.lifecycle.mark_shut_down();
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_established()
    }
}

#[async_trait]
impl VersionedStore for MemoryClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.call("get", |store| {
            store.with_live(key, |entries| entries.get(key).and_then(|e| e.payload.clone()))
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.call("exists", |store| {
            store.with_live(key, |entries| entries.contains_key(key))
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        version: i64,
        payload: Option<&[u8]>,
        ttl: Ttl,
    ) -> Result<bool> {
        trace!(key = %key, version, ttl = %ttl, metadata_only = payload.is_none(), "set");
        self.call("set", |store| {
            let expires_at = ttl.expires_at(store.inner.clock.now());
            store.with_live(key, |entries| {
                match entries.get_mut(key) {
                    Some(entry) => {
                        if let Some(payload) = payload {
                            entry.payload = Some(payload.to_vec());
                        }
                        entry.version = version;
                        entry.expires_at = expires_at;
                    }
                    None => {
                        entries.insert(
                            key.to_string(),
                            StoreEntry {
                                payload: payload.map(<[u8]>::to_vec),
                                version,
                                expires_at,
                            },
                        );
                    }
                }
                true
            })
        })
        .await
    }

    async fn add(&self, key: &str, version: i64, payload: &[u8], ttl: Ttl) -> Result<bool> {
        trace!(key = %key, version, ttl = %ttl, "add");
        self.call("add", |store| {
            let expires_at = ttl.expires_at(store.inner.clock.now());
            store.with_live(key, |entries| {
                if entries.contains_key(key) {
                    return false;
                }
                entries.insert(
                    key.to_string(),
                    StoreEntry {
                        payload: Some(payload.to_vec()),
                        version,
                        expires_at,
                    },
                );
                true
            })
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.call("delete", |store| {
            store.with_live(key, |entries| entries.remove(key).is_some())
        })
        .await
    }

    async fn version(&self, key: &str) -> Result<i64> {
        self.call("version", |store| {
            store.with_live(key, |entries| entries.get(key).map_or(0, |e| e.version))
        })
        .await
    }
}
