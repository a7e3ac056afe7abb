//! Key-value client over a document collection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::collection::{
    CollectionError, Document, DocumentCollection, DocumentUpdate, FIELD_EXPIRY, FIELD_ID,
    IndexSpec,
};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::deadline::with_deadline;
use crate::error::{ClientError, Result};
use crate::lifecycle::LifecycleCell;
use crate::store::{Lifecycle, VersionedStore};
use crate::ttl::Ttl;

impl From<CollectionError> for ClientError {
    fn from(e: CollectionError) -> Self {
        ClientError::connection(e)
    }
}

/// Stores each record as one document `{id, session, version, expiry}`.
///
/// `establish` creates a unique index on `id` and a TTL index on `expiry`,
/// so the backend purges expired sessions by itself.
pub struct DocumentClient<C: DocumentCollection> {
    collection: C,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    lifecycle: LifecycleCell,
}

impl<C: DocumentCollection> DocumentClient<C> {
    /// Create a client over `collection`.
    pub fn new(collection: C, config: ClientConfig) -> Self {
        Self::with_clock(collection, config, Arc::new(SystemClock))
    }

    /// Create a client that computes expiry instants from `clock`.
    pub fn with_clock(collection: C, config: ClientConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            collection,
            config,
            clock,
            lifecycle: LifecycleCell::new(),
        }
    }

    /// The underlying collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn ready(&self) -> Result<()> {
        self.lifecycle.ensure_established()
    }
}

#[async_trait]
impl<C: DocumentCollection> Lifecycle for DocumentClient<C> {
    async fn establish(&self) -> Result<()> {
        if self.lifecycle.is_established() {
            info!(server = %self.config.server, "Re-establishing document client");
            self.lifecycle.mark_shut_down();
        }

        with_deadline("establish", self.config.timeout, async {
            self.collection
                .ensure_index(IndexSpec::Unique { field: FIELD_ID })
                .await?;
            self.collection
                .ensure_index(IndexSpec::Ttl {
                    field: FIELD_EXPIRY,
                    expire_after: Duration::ZERO,
                })
                .await?;
            Ok::<_, ClientError>(())
        })
        .await?;

        self.lifecycle.mark_established();
        info!(server = %self.config.server, "Document client established");
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
impl<C: DocumentCollection> VersionedStore for DocumentClient<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ready()?;
        with_deadline("get", self.config.timeout, async {
            Ok::<_, ClientError>(
                self.collection
                    .find_one(key)
                    .await?
                    .and_then(|d| d.session),
            )
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ready()?;
        with_deadline("exists", self.config.timeout, async {
            Ok::<_, ClientError>(self.collection.count(key).await? > 0)
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
        self.ready()?;
        debug!(key = %key, version, ttl = %ttl, metadata_only = payload.is_none(), "Saving session document");
        let update = DocumentUpdate {
            session: payload.map(<[u8]>::to_vec),
            version,
            expiry: ttl.expires_at(self.clock.now()),
        };
        with_deadline("set", self.config.timeout, async {
            self.collection.upsert(key, update).await?;
            Ok::<_, ClientError>(true)
        })
        .await
    }

    async fn add(&self, key: &str, version: i64, payload: &[u8], ttl: Ttl) -> Result<bool> {
        self.ready()?;
        debug!(key = %key, version, ttl = %ttl, "Adding session document");
        let document = Document {
            id: key.to_string(),
            session: Some(payload.to_vec()),
            version,
            expiry: ttl.expires_at(self.clock.now()),
        };
        with_deadline("add", self.config.timeout, async {
            match self.collection.insert(document).await {
                Ok(()) => Ok(true),
                Err(CollectionError::DuplicateKey(_)) => Ok(false),
                Err(e) => Err(ClientError::from(e)),
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.ready()?;
        debug!(key = %key, "Deleting session document");
        with_deadline("delete", self.config.timeout, async {
            Ok::<_, ClientError>(self.collection.remove(key).await? > 0)
        })
        .await
    }

    async fn version(&self, key: &str) -> Result<i64> {
        self.ready()?;
        with_deadline("version", self.config.timeout, async {
            Ok::<_, ClientError>(self.collection.find_version(key).await?.unwrap_or(0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::document::MemoryCollection;
    use std::time::UNIX_EPOCH;

    async fn connected() -> (Arc<ManualClock>, MemoryCollection, DocumentClient<MemoryCollection>) {
        let clock = Arc::new(ManualClock::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000)));
        let collection = MemoryCollection::with_clock(clock.clone(), Duration::from_secs(60));
        let client =
            DocumentClient::with_clock(collection.clone(), ClientConfig::default(), clock.clone());
        client.establish().await.unwrap();
        (clock, collection, client)
    }

    #[tokio::test]
    async fn test_establish_creates_indexes() {
        let (_clock, collection, client) = connected().await;
        assert!(client.is_alive());
        assert_eq!(
            collection.indexes(),
            vec![
                IndexSpec::Unique { field: FIELD_ID },
                IndexSpec::Ttl {
                    field: FIELD_EXPIRY,
                    expire_after: Duration::ZERO
                },
            ]
        );

        // Re-establishing is allowed and does not duplicate indexes.
        client.establish().await.unwrap();
        assert_eq!(collection.indexes().len(), 2);
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let (_clock, _collection, client) = connected().await;

        assert!(client.add_forever("s1", 1, b"hello").await.unwrap());
        assert!(!client.add_forever("s1", 2, b"world").await.unwrap());
        assert_eq!(client.get("s1").await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(client.version("s1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_metadata_only() {
        let (_clock, _collection, client) = connected().await;

        client.set_forever("s1", 1, Some(b"data")).await.unwrap();
        client.set_forever("s1", 2, None).await.unwrap();

        assert_eq!(client.get("s1").await.unwrap(), Some(b"data".to_vec()));
        assert_eq!(client.version("s1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_version_of_missing() {
        let (_clock, _collection, client) = connected().await;

        client.set_forever("s1", 3, Some(b"x")).await.unwrap();
        assert!(client.delete("s1").await.unwrap());
        assert!(!client.exists("s1").await.unwrap());
        assert_eq!(client.version("s1").await.unwrap(), 0);
        assert!(!client.delete("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expiry_follows_ttl_encoding() {
        let (clock, collection, client) = connected().await;

        client.set("s1", 1, Some(b"x"), Ttl::from_raw(5)).await.unwrap();
        let stored = collection.find_one("s1").await.unwrap().unwrap();
        assert_eq!(stored.expiry, Some(clock.now() + Duration::from_secs(5)));

        client
            .set("s2", 1, Some(b"y"), Ttl::from_raw(1_800_000_000))
            .await
            .unwrap();
        let stored = collection.find_one("s2").await.unwrap().unwrap();
        assert_eq!(
            stored.expiry,
            Some(UNIX_EPOCH + Duration::from_secs(1_800_000_000))
        );
    }

    #[tokio::test]
    async fn test_backend_purges_expired() {
        let (clock, _collection, client) = connected().await;

        client.set("s1", 3, Some(b"world"), Ttl::from_raw(5)).await.unwrap();
        clock.advance(Duration::from_secs(6));
        assert_eq!(client.collection().purge_expired(), 1);

        assert_eq!(client.get("s1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_collection_maps_to_connection_error() {
        let (_clock, collection, client) = connected().await;

        collection.set_unavailable(true);
        let err = client.exists("s1").await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }));
        assert_eq!(client.version_or_zero("s1").await, 0);
    }

    #[tokio::test]
    async fn test_requires_establish() {
        let client = DocumentClient::new(MemoryCollection::new(), ClientConfig::default());
        assert!(client.get("s1").await.unwrap_err().is_not_established());

        client.establish().await.unwrap();
        client.shutdown().await.unwrap();
        assert!(client.version("s1").await.unwrap_err().is_not_established());
    }
}
