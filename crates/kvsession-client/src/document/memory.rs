//! In-memory [`DocumentCollection`] with index semantics.
//!
//! Without a unique index duplicate ids are accepted, as a real document
//! store would. Expired documents are only removed by the TTL monitor, so
//! reads between expiry and the next monitor pass still see them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::collection::{
    CollectionError, Document, DocumentCollection, DocumentUpdate, FIELD_ID, IndexSpec,
};
use crate::clock::{Clock, SystemClock};

/// Default interval between TTL monitor passes.
pub const DEFAULT_TTL_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

struct CollectionInner {
    documents: Mutex<Vec<Document>>,
    indexes: Mutex<Vec<IndexSpec>>,
    clock: Arc<dyn Clock>,
    monitor_interval: Duration,
    monitor: Mutex<Option<JoinHandle<()>>>,
    unavailable: AtomicBool,
}

impl Drop for CollectionInner {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor.get_mut().take() {
            handle.abort();
        }
    }
}

/// Shared in-memory document collection.
#[derive(Clone)]
pub struct MemoryCollection {
    inner: Arc<CollectionInner>,
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollection {
    /// Create an empty collection on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_TTL_MONITOR_INTERVAL)
    }

    /// Create an empty collection with an explicit clock and monitor interval.
    pub fn with_clock(clock: Arc<dyn Clock>, monitor_interval: Duration) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                documents: Mutex::new(Vec::new()),
                indexes: Mutex::new(Vec::new()),
                clock,
                monitor_interval,
                monitor: Mutex::new(None),
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Indexes created so far.
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.inner.indexes.lock().clone()
    }

    /// Number of stored documents, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.documents.lock().len()
    }

    /// Check if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.inner.documents.lock().is_empty()
    }

    /// Make every call fail as if the server were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Run one TTL monitor pass now. Returns the number of purged documents.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    fn check_available(&self) -> Result<(), CollectionError> {
        if self.inner.unavailable.load(Ordering::Relaxed) {
            Err(CollectionError::Unavailable("memory collection".to_string()))
        } else {
            Ok(())
        }
    }

    fn has_unique_id(&self) -> bool {
        self.inner
            .indexes
            .lock()
            .iter()
            .any(|i| matches!(i, IndexSpec::Unique { field } if *field == FIELD_ID))
    }

    fn start_monitor(&self) {
        let mut monitor = self.inner.monitor.lock();
        if monitor.is_some() {
            return;
        }
        let weak: Weak<CollectionInner> = Arc::downgrade(&self.inner);
        let interval = self.inner.monitor_interval;
        debug!(interval_ms = interval.as_millis() as u64, "Starting TTL monitor");
        *monitor = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.purge_expired();
            }
        }));
    }
}

impl CollectionInner {
    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl_indexes: Vec<Duration> = self
            .indexes
            .lock()
            .iter()
            .filter_map(|i| match i {
                IndexSpec::Ttl { expire_after, .. } => Some(*expire_after),
                IndexSpec::Unique { .. } => None,
            })
            .collect();
        let Some(expire_after) = ttl_indexes.into_iter().min() else {
            return 0;
        };

        let mut documents = self.documents.lock();
        let before = documents.len();
        documents.retain(|d| match d.expiry {
            Some(expiry) => now < expiry + expire_after,
            None => true,
        });
        let purged = before - documents.len();
        if purged > 0 {
            debug!(purged, "TTL monitor purged expired documents");
        }
        purged
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn ensure_index(&self, spec: IndexSpec) -> Result<(), CollectionError> {
        self.check_available()?;
        {
            let mut indexes = self.inner.indexes.lock();
            if indexes.contains(&spec) {
                return Ok(());
            }
            indexes.push(spec);
        }
        trace!(?spec, "Index created");
        if matches!(spec, IndexSpec::Ttl { .. }) {
            self.start_monitor();
        }
        Ok(())
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>, CollectionError> {
        self.check_available()?;
        Ok(self
            .inner
            .documents
            .lock()
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    async fn find_version(&self, id: &str) -> Result<Option<i64>, CollectionError> {
        self.check_available()?;
        Ok(self
            .inner
            .documents
            .lock()
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.version))
    }

    async fn count(&self, id: &str) -> Result<u64, CollectionError> {
        self.check_available()?;
        Ok(self
            .inner
            .documents
            .lock()
            .iter()
            .filter(|d| d.id == id)
            .count() as u64)
    }

    async fn upsert(&self, id: &str, update: DocumentUpdate) -> Result<(), CollectionError> {
        self.check_available()?;
        let mut documents = self.inner.documents.lock();
        match documents.iter_mut().find(|d| d.id == id) {
            Some(document) => {
                if update.session.is_some() {
                    document.session = update.session;
                }
                document.version = update.version;
                document.expiry = update.expiry;
            }
            None => documents.push(Document {
                id: id.to_string(),
                session: update.session,
                version: update.version,
                expiry: update.expiry,
            }),
        }
        Ok(())
    }

    async fn insert(&self, document: Document) -> Result<(), CollectionError> {
        self.check_available()?;
        let unique = self.has_unique_id();
        let mut documents = self.inner.documents.lock();
        if unique && documents.iter().any(|d| d.id == document.id) {
            return Err(CollectionError::DuplicateKey(document.id));
        }
        documents.push(document);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<u64, CollectionError> {
        self.check_available()?;
        let mut documents = self.inner.documents.lock();
        let before = documents.len();
        documents.retain(|d| d.id != id);
        Ok((before - documents.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn doc(id: &str, version: i64, expiry: Option<SystemTime>) -> Document {
        Document {
            id: id.to_string(),
            session: Some(id.as_bytes().to_vec()),
            version,
            expiry,
        }
    }

    #[tokio::test]
    async fn test_duplicates_allowed_without_unique_index() {
        let collection = MemoryCollection::new();
        collection.insert(doc("a", 1, None)).await.unwrap();
        collection.insert(doc("a", 2, None)).await.unwrap();
        assert_eq!(collection.count("a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let collection = MemoryCollection::new();
        collection
            .ensure_index(IndexSpec::Unique { field: FIELD_ID })
            .await
            .unwrap();

        collection.insert(doc("a", 1, None)).await.unwrap();
        let err = collection.insert(doc("a", 2, None)).await.unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateKey(id) if id == "a"));
        assert_eq!(collection.find_version("a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_upsert_without_session_keeps_payload() {
        let collection = MemoryCollection::new();
        collection.insert(doc("a", 1, None)).await.unwrap();

        collection
            .upsert(
                "a",
                DocumentUpdate {
                    session: None,
                    version: 5,
                    expiry: None,
                },
            )
            .await
            .unwrap();

        let found = collection.find_one("a").await.unwrap().unwrap();
        assert_eq!(found.session, Some(b"a".to_vec()));
        assert_eq!(found.version, 5);
    }

    #[tokio::test]
    async fn test_purge_needs_ttl_index() {
        let clock = Arc::new(ManualClock::new(UNIX_EPOCH + Duration::from_secs(100)));
        let collection = MemoryCollection::with_clock(clock.clone(), Duration::from_secs(60));
        collection
            .insert(doc("a", 1, Some(UNIX_EPOCH + Duration::from_secs(50))))
            .await
            .unwrap();

        assert_eq!(collection.purge_expired(), 0);
        assert_eq!(collection.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_monitor_purges_on_interval() {
        let clock = Arc::new(ManualClock::new(UNIX_EPOCH + Duration::from_secs(100)));
        let collection = MemoryCollection::with_clock(clock.clone(), Duration::from_secs(60));
        collection
            .ensure_index(IndexSpec::Ttl {
                field: "expiry",
                expire_after: Duration::ZERO,
            })
            .await
            .unwrap();

        collection
            .insert(doc("a", 1, Some(UNIX_EPOCH + Duration::from_secs(110))))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(20));

        // Expired but not yet purged.
        assert!(collection.find_one("a").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(collection.find_one("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let collection = MemoryCollection::new();
        let spec = IndexSpec::Unique { field: FIELD_ID };
        collection.ensure_index(spec).await.unwrap();
        collection.ensure_index(spec).await.unwrap();
        assert_eq!(collection.indexes(), vec![spec]);
    }
}
