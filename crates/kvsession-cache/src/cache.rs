//! Write-through local session cache with per-session reconciliation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kvsession_client::{KvsClient, Ttl};
use kvsession_transcoder::{JsonTranscoder, Transcoder};
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::reconciler::{ReconcileOutcome, TaskRegistry};
use crate::session::{SessionData, SessionHandle, attribute_digest};

/// A resident session.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The live session object shared with callers.
    pub handle: SessionHandle,

    /// Digest of the attributes last written to the backend.
    pub attribute_hash: Option<String>,

    /// Backend key.
    pub key: String,

    /// Generation of the reconciliation check owned by this entry.
    pub(crate) generation: Option<u64>,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of resident sessions.
    pub size: usize,

    /// Number of scheduled reconciliation checks.
    pub scheduled_checks: usize,
}

struct CacheInner<C, T> {
    client: C,
    transcoder: T,
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    tasks: TaskRegistry,
    permits: Semaphore,
    closed: AtomicBool,
}

/// Local session cache in front of a key-value client.
///
/// This cache provides:
/// - Reads served from memory for resident sessions
/// - Write-through saves that skip the payload when attributes are unchanged
/// - A cancellable reconciliation check per resident session, every
///   `session_ttl + reconcile_buffer`, that reloads the session when the
///   backend version moved and drops it when the backend no longer has it
///
/// Cloning is cheap and shares the same cache.
pub struct LocalCache<C, T = JsonTranscoder> {
    inner: Arc<CacheInner<C, T>>,
}

impl<C, T> Clone for LocalCache<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: KvsClient + 'static> LocalCache<C, JsonTranscoder> {
    /// Create a cache that stores sessions as JSON.
    pub fn new(client: C, config: CacheConfig) -> Self {
        Self::with_transcoder(client, JsonTranscoder, config)
    }
}

impl<C, T> LocalCache<C, T>
where
    C: KvsClient + 'static,
    T: Transcoder + 'static,
{
    /// Create a cache with an explicit transcoder.
    pub fn with_transcoder(client: C, transcoder: T, config: CacheConfig) -> Self {
        let permits = Semaphore::new(config.reconcile_workers.max(1));
        Self {
            inner: Arc::new(CacheInner {
                client,
                transcoder,
                config,
                entries: DashMap::new(),
                tasks: TaskRegistry::new(),
                permits,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.inner.client
    }

    /// Get the current number of resident sessions.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Check if a session is resident.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.entries.contains_key(id)
    }

    /// Copy of the resident entry for `id`.
    pub fn entry(&self, id: &str) -> Option<CacheEntry> {
        self.inner.entries.get(id).map(|e| e.clone())
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.inner.entries.len(),
            scheduled_checks: self.inner.tasks.len(),
        }
    }

    /// Establish the underlying client.
    pub async fn start(&self) -> Result<()> {
        self.inner.ensure_open()?;
        self.inner.client.establish().await?;
        info!(
            workers = self.inner.config.reconcile_workers,
            interval_secs = self.inner.config.reconcile_interval().as_secs(),
            "Session cache started"
        );
        Ok(())
    }

    /// Stop all reconciliation, drop resident sessions and shut the client
    /// down. Later calls fail with [`Error::Closed`].
    ///
    /// In-flight backend calls are left to complete.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.tasks.cancel_all();
        self.inner.permits.close();
        let dropped = self.inner.entries.len();
        self.inner.entries.clear();
        info!(dropped, "Session cache shut down");
        self.inner.client.shutdown().await?;
        Ok(())
    }

    /// Whether the backend holds a session with this id.
    ///
    /// Backend failures are logged and reported as "not in use".
    pub async fn id_in_use(&self, id: &str) -> bool {
        let key = self.inner.config.mangle_key(id);
        match self.inner.client.exists(&key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Existence check failed, treating id as unused");
                false
            }
        }
    }

    /// Create a new session and make it resident.
    ///
    /// Uses the backend's create-if-absent, so of two processes racing on
    /// the same id exactly one succeeds; the other gets
    /// [`Error::AlreadyExists`].
    pub async fn create(&self, id: &str) -> Result<SessionHandle> {
        self.inner.ensure_open()?;
        let key = self.inner.config.mangle_key(id);

        let mut data = SessionData::new(id);
        data.version = 1;
        let bytes = self.inner.transcoder.encode(&data)?;
        let hash = attribute_digest(&self.inner.transcoder, &data.attributes)?;

        if !self
            .inner
            .client
            .add(&key, data.version, &bytes, self.inner.ttl())
            .await?
        {
            return Err(Error::AlreadyExists(id.to_string()));
        }
        debug!(session_id = %id, key = %key, "Session created");

        let handle = data.into_handle();
        let generation = self.inner.schedule_check(id);
        self.inner.entries.insert(
            id.to_string(),
            CacheEntry {
                handle: handle.clone(),
                attribute_hash: Some(hash),
                key,
                generation,
            },
        );
        Ok(handle)
    }

    /// Get a session, loading it from the backend on a miss.
    ///
    /// Returns `Ok(None)` when the backend has no such session.
    pub async fn get(&self, id: &str) -> Result<Option<SessionHandle>> {
        self.inner.ensure_open()?;
        if let Some(handle) = self.inner.entries.get(id).map(|e| e.handle.clone()) {
            trace!(session_id = %id, "Session found in cache");
            handle.write().touch();
            return Ok(Some(handle));
        }

        debug!(session_id = %id, "Session cache miss, loading from backend");
        let key = self.inner.config.mangle_key(id);
        match self.inner.load(&key).await? {
            Some((data, hash)) => Ok(Some(self.inner.adopt(id, key, data, hash))),
            None => Ok(None),
        }
    }

    /// Write a session through to the backend, bumping its version.
    ///
    /// When the attributes hash the same as at the last write, only the
    /// version and expiry are sent.
    pub async fn save(&self, handle: &SessionHandle) -> Result<bool> {
        self.inner.ensure_open()?;
        let data = {
            let mut session = handle.write();
            session.version += 1;
            session.touch();
            session.clone()
        };
        let hash = attribute_digest(&self.inner.transcoder, &data.attributes)?;

        let resident = self
            .inner
            .entries
            .get(&data.id)
            .filter(|e| Arc::ptr_eq(&e.handle, handle))
            .map(|e| (e.key.clone(), e.attribute_hash.clone()));
        let (key, previous_hash) = match resident {
            Some((key, previous_hash)) => (key, previous_hash),
            None => (self.inner.config.mangle_key(&data.id), None),
        };
        let ttl = self.inner.ttl();

        if previous_hash.as_deref() == Some(hash.as_str()) {
            debug!(session_id = %data.id, version = data.version, "Attributes unchanged, writing metadata only");
            return Ok(self.inner.client.set(&key, data.version, None, ttl).await?);
        }

        let bytes = self.inner.transcoder.encode(&data)?;
        debug!(session_id = %data.id, version = data.version, bytes = bytes.len(), "Writing session");
        let stored = self
            .inner
            .client
            .set(&key, data.version, Some(&bytes), ttl)
            .await?;

        if let Some(mut entry) = self.inner.entries.get_mut(&data.id)
            && Arc::ptr_eq(&entry.handle, handle)
        {
            entry.attribute_hash = Some(hash);
        }
        Ok(stored)
    }

    /// Delete a session from the backend and drop it locally.
    ///
    /// The local copy is dropped even when the delete fails, after which the
    /// delete error is returned. Returns whether the session was resident in
    /// this process.
    pub async fn invalidate(&self, id: &str) -> Result<bool> {
        self.inner.ensure_open()?;
        let key = self.inner.config.mangle_key(id);
        let deleted = self.inner.client.delete(&key).await;
        let was_resident = self.inner.evict(id);
        let deleted = deleted?;
        debug!(session_id = %id, was_resident, deleted, "Session invalidated");
        Ok(was_resident)
    }

    /// Reload a session from the backend, replacing the resident copy.
    ///
    /// If the backend no longer has it, the resident copy is dropped and
    /// [`Error::NotFound`] is returned.
    pub async fn refresh(&self, id: &str) -> Result<SessionHandle> {
        self.inner.refresh(id).await
    }

    /// Compare a resident session's version with the backend and refresh or
    /// drop it as needed. This is what each scheduled check runs.
    pub async fn reconcile(&self, id: &str) -> Result<ReconcileOutcome> {
        self.inner.reconcile(id).await
    }
}

impl<C, T> CacheInner<C, T>
where
    C: KvsClient + 'static,
    T: Transcoder + 'static,
{
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn ttl(&self) -> Ttl {
        Ttl::after(self.config.session_ttl, SystemTime::now())
    }

    /// Fetch and decode a session. The backend version wins over the one in
    /// the payload, which metadata-only writes leave behind.
    async fn load(&self, key: &str) -> Result<Option<(SessionData, String)>> {
        let Some(bytes) = self.client.get(key).await? else {
            return Ok(None);
        };
        let mut data: SessionData = self.transcoder.decode(&bytes)?;
        let version = self.client.version(key).await?;
        if version != 0 {
            data.version = version;
        }
        let hash = attribute_digest(&self.transcoder, &data.attributes)?;
        Ok(Some((data, hash)))
    }

    /// Make a loaded session resident unless another caller got there first.
    fn adopt(
        self: &Arc<Self>,
        id: &str,
        key: String,
        data: SessionData,
        hash: String,
    ) -> SessionHandle {
        let handle = match self.entries.entry(id.to_string()) {
            Entry::Occupied(existing) => return existing.get().handle.clone(),
            Entry::Vacant(vacant) => {
                let handle = data.into_handle();
                let generation = self.schedule_check(id);
                vacant.insert(CacheEntry {
                    handle: handle.clone(),
                    attribute_hash: Some(hash),
                    key,
                    generation,
                });
                handle
            }
        };
        debug!(session_id = %id, cache_size = self.entries.len(), "Session loaded from backend");
        handle
    }

    /// Drop the resident entry and the check it owns. A check registered
    /// for a newer entry of the same id is left alone.
    fn evict(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, entry)) => {
                if let Some(generation) = entry.generation {
                    self.tasks.cancel_generation(id, generation);
                }
                true
            }
            None => false,
        }
    }

    async fn refresh(self: &Arc<Self>, id: &str) -> Result<SessionHandle> {
        self.ensure_open()?;
        let key = self.config.mangle_key(id);
        let Some((data, hash)) = self.load(&key).await? else {
            if self.evict(id) {
                debug!(session_id = %id, "Session gone from backend, evicted");
            }
            return Err(Error::NotFound(id.to_string()));
        };

        match self.overwrite_resident(id, data, hash) {
            Ok(handle) => Ok(handle),
            Err((data, hash)) => Ok(self.adopt(id, key, data, hash)),
        }
    }

    /// Replace the contents of the resident session for `id` in place.
    /// Hands the data back when nothing is resident.
    fn overwrite_resident(
        &self,
        id: &str,
        data: SessionData,
        hash: String,
    ) -> std::result::Result<SessionHandle, (SessionData, String)> {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return Err((data, hash));
        };
        let version = data.version;
        *entry.handle.write() = data;
        entry.attribute_hash = Some(hash);
        debug!(session_id = %id, version, "Session refreshed from backend");
        Ok(entry.handle.clone())
    }

    async fn reconcile(&self, id: &str) -> Result<ReconcileOutcome> {
        let Some((handle, key)) = self
            .entries
            .get(id)
            .map(|e| (e.handle.clone(), e.key.clone()))
        else {
            return Ok(ReconcileOutcome::Gone);
        };

        let local = handle.read().version;
        let remote = self.client.version(&key).await?;
        if remote == local {
            trace!(session_id = %id, version = local, "Session up to date");
            return Ok(ReconcileOutcome::Unchanged);
        }

        debug!(session_id = %id, local, remote, "Version mismatch, refreshing");
        let Some((data, hash)) = self.load(&key).await? else {
            return Ok(if self.evict(id) {
                debug!(session_id = %id, "Session gone from backend, evicted");
                ReconcileOutcome::Evicted
            } else {
                ReconcileOutcome::Gone
            });
        };
        // Only sessions still resident are updated; one dropped while loading
        // stays dropped.
        match self.overwrite_resident(id, data, hash) {
            Ok(_) => Ok(ReconcileOutcome::Refreshed),
            Err(_) => Ok(ReconcileOutcome::Gone),
        }
    }

    /// Start (or restart) the periodic check for `id` and return its
    /// generation, or `None` once the cache is closed.
    fn schedule_check(self: &Arc<Self>, id: &str) -> Option<u64> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let (generation, token) = self.tasks.register(id);
        let interval = self.config.reconcile_interval();
        let weak = Arc::downgrade(self);
        let id = id.to_string();
        trace!(session_id = %id, interval_secs = interval.as_secs(), "Scheduling reconciliation");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };

                let outcome = {
                    let _permit = tokio::select! {
                        _ = token.cancelled() => break,
                        permit = inner.permits.acquire() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                    };
                    inner.reconcile(&id).await
                };

                match outcome {
                    Ok(outcome) if outcome.is_terminal() => {
                        trace!(session_id = %id, ?outcome, "Reconciliation finished");
                        break;
                    }
                    Ok(outcome) => trace!(session_id = %id, ?outcome, "Reconciliation check done"),
                    Err(e) => warn!(session_id = %id, error = %e, "Reconciliation check failed"),
                }
                if token.is_cancelled() {
                    break;
                }
            }

            if let Some(inner) = weak.upgrade() {
                inner.tasks.release(&id, generation);
            }
        });
        Some(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvsession_client::{Lifecycle, MemoryClient, MemoryStore, VersionedStore};
    use kvsession_metrics::{InstrumentedClient, NoopRegistry};
    use std::time::{Duration, UNIX_EPOCH};

    async fn started(store: &MemoryStore, config: CacheConfig) -> LocalCache<MemoryClient> {
        let cache = LocalCache::new(MemoryClient::new(store.clone()), config);
        cache.start().await.unwrap();
        cache
    }

    fn stored_session(store: &MemoryStore, key: &str) -> SessionData {
        let entry = store.entry(key).unwrap();
        JsonTranscoder.decode(&entry.payload.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_resident_session_served_without_backend() {
        let store = MemoryStore::new();
        let client = InstrumentedClient::for_backend(
            MemoryClient::new(store.clone()),
            Arc::new(NoopRegistry),
            "memory",
            "local",
        );
        let cache = LocalCache::new(client, CacheConfig::default());
        cache.start().await.unwrap();

        let created = cache.create("s1").await.unwrap();
        let fetched = cache.get("s1").await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(cache.client().snapshot().reads, 0);
        assert_eq!(cache.client().snapshot().inserts, 1);
    }

    #[tokio::test]
    async fn test_create_existing_id_fails() {
        let store = MemoryStore::new();
        let a = started(&store, CacheConfig::default()).await;
        let b = started(&store, CacheConfig::default()).await;

        a.create("s1").await.unwrap();
        let err = b.create("s1").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(id) if id == "s1"));
        assert!(!b.contains("s1"));
    }

    #[tokio::test]
    async fn test_get_miss_loads_and_schedules_check() {
        let store = MemoryStore::new();
        let a = started(&store, CacheConfig::default()).await;
        let b = started(&store, CacheConfig::default()).await;

        let session = a.create("s1").await.unwrap();
        session.write().set_attribute("user", "alice");
        a.save(&session).await.unwrap();

        assert!(b.get("missing").await.unwrap().is_none());

        let loaded = b.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.read().attribute("user"), Some(&serde_json::json!("alice")));
        assert_eq!(loaded.read().version, 2);
        assert_eq!(
            b.stats(),
            CacheStats {
                size: 1,
                scheduled_checks: 1
            }
        );
    }

    #[tokio::test]
    async fn test_unchanged_save_is_metadata_only() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;

        let session = cache.create("s1").await.unwrap();
        session.write().set_attribute("cart", serde_json::json!(["book"]));
        cache.save(&session).await.unwrap();
        assert_eq!(stored_session(&store, "s1").version, 2);

        cache.save(&session).await.unwrap();
        let entry = store.entry("s1").unwrap();
        assert_eq!(entry.version, 3);
        // Payload still the one written at version 2.
        let payload = stored_session(&store, "s1");
        assert_eq!(payload.version, 2);
        assert_eq!(payload.attribute("cart"), Some(&serde_json::json!(["book"])));
    }

    #[tokio::test]
    async fn test_load_prefers_backend_version() {
        let store = MemoryStore::new();
        let a = started(&store, CacheConfig::default()).await;
        let b = started(&store, CacheConfig::default()).await;

        let session = a.create("s1").await.unwrap();
        a.save(&session).await.unwrap();
        a.save(&session).await.unwrap();

        let loaded = b.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.read().version, 3);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;

        cache.create("s1").await.unwrap();
        assert_eq!(cache.stats().scheduled_checks, 1);

        assert!(cache.invalidate("s1").await.unwrap());
        assert!(store.entry("s1").is_none());
        assert_eq!(cache.stats().scheduled_checks, 0);
        assert!(!cache.invalidate("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_propagates_delete_failure() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;
        cache.create("s1").await.unwrap();

        store.set_unavailable(true);
        let err = cache.invalidate("s1").await.unwrap_err();
        assert!(matches!(err, Error::Client(_)));
        assert!(!cache.contains("s1"));
    }

    #[tokio::test]
    async fn test_id_in_use() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;

        cache.create("s1").await.unwrap();
        assert!(cache.id_in_use("s1").await);
        assert!(!cache.id_in_use("s2").await);

        store.set_unavailable(true);
        assert!(!cache.id_in_use("s1").await);
    }

    #[tokio::test]
    async fn test_key_mangling() {
        let store = MemoryStore::new();
        let config = CacheConfig::new()
            .with_key_prefix("app:")
            .with_key_suffix(":sess");
        let cache = started(&store, config).await;

        cache.create("s1").await.unwrap();
        assert!(store.entry("app:s1:sess").is_some());
        assert!(store.entry("s1").is_none());
        assert_eq!(cache.entry("s1").unwrap().key, "app:s1:sess");
        assert!(cache.id_in_use("s1").await);
    }

    #[tokio::test]
    async fn test_refresh_evicts_when_gone() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;
        cache.create("s1").await.unwrap();

        let other = MemoryClient::new(store.clone());
        other.establish().await.unwrap();
        other.delete("s1").await.unwrap();

        let err = cache.refresh("s1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!cache.contains("s1"));
        assert_eq!(cache.stats().scheduled_checks, 0);
    }

    #[tokio::test]
    async fn test_reconcile_outcomes() {
        let store = MemoryStore::new();
        let a = started(&store, CacheConfig::default()).await;
        let b = started(&store, CacheConfig::default()).await;

        assert_eq!(a.reconcile("s1").await.unwrap(), ReconcileOutcome::Gone);

        let mine = a.create("s1").await.unwrap();
        assert_eq!(a.reconcile("s1").await.unwrap(), ReconcileOutcome::Unchanged);

        let theirs = b.get("s1").await.unwrap().unwrap();
        theirs.write().set_attribute("user", "bob");
        b.save(&theirs).await.unwrap();

        assert_eq!(a.reconcile("s1").await.unwrap(), ReconcileOutcome::Refreshed);
        assert_eq!(mine.read().attribute("user"), Some(&serde_json::json!("bob")));
        assert_eq!(mine.read().version, 2);

        b.invalidate("s1").await.unwrap();
        assert_eq!(a.reconcile("s1").await.unwrap(), ReconcileOutcome::Evicted);
        assert!(!a.contains("s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_racing_invalidate_does_not_restore_session() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;
        cache.create("s1").await.unwrap();

        // Another process bumps the version so the check reloads.
        let other = MemoryClient::new(store.clone());
        other.establish().await.unwrap();
        other.set_forever("s1", 7, None).await.unwrap();

        // Reload fetches the payload at 20ms; the delete lands at 22ms.
        store.set_latency(Duration::from_millis(10));
        let (reconciled, invalidated) = tokio::join!(cache.reconcile("s1"), async {
            tokio::time::sleep(Duration::from_millis(12)).await;
            cache.invalidate("s1").await
        });

        assert_eq!(reconciled.unwrap(), ReconcileOutcome::Gone);
        assert!(invalidated.unwrap());
        assert!(store.entry("s1").is_none());
        assert!(!cache.contains("s1"));
        assert_eq!(cache.stats().scheduled_checks, 0);
    }

    #[tokio::test]
    async fn test_evict_keeps_newer_check() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;
        cache.create("s1").await.unwrap();

        // A check registered after the entry was captured belongs to someone else.
        let newer = cache.inner.schedule_check("s1");
        assert!(newer.is_some());
        assert_ne!(cache.entry("s1").unwrap().generation, newer);

        assert!(cache.inner.evict("s1"));
        assert!(!cache.contains("s1"));
        assert_eq!(cache.stats().scheduled_checks, 1);
    }

    #[tokio::test]
    async fn test_huge_session_ttl_is_clamped() {
        let store = MemoryStore::new();
        let config = CacheConfig::new().with_session_ttl(Duration::from_secs(i64::MAX as u64));
        let cache = started(&store, config).await;

        cache.create("s1").await.unwrap();
        assert_eq!(
            store.entry("s1").unwrap().expires_at,
            Some(UNIX_EPOCH + Duration::from_secs(i32::MAX as u64))
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_cache() {
        let store = MemoryStore::new();
        let cache = started(&store, CacheConfig::default()).await;
        cache.create("s1").await.unwrap();

        cache.shutdown().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().scheduled_checks, 0);
        assert!(!cache.client().is_alive());
        assert!(matches!(cache.get("s1").await, Err(Error::Closed)));
        assert!(matches!(cache.start().await, Err(Error::Closed)));

        cache.shutdown().await.unwrap();
    }
}
