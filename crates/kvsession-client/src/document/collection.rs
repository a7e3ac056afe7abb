//! Document collection capability used by [`super::DocumentClient`].

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

/// Field holding the record key.
pub const FIELD_ID: &str = "id";
/// Field the backend uses to expire a document.
pub const FIELD_EXPIRY: &str = "expiry";
/// Field holding the caller-supplied version.
pub const FIELD_VERSION: &str = "version";
/// Field holding the raw payload.
pub const FIELD_SESSION: &str = "session";

/// One stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub session: Option<Vec<u8>>,
    pub version: i64,
    pub expiry: Option<SystemTime>,
}

/// Partial update applied by an upsert. `session: None` leaves the stored
/// payload as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub session: Option<Vec<u8>>,
    pub version: i64,
    pub expiry: Option<SystemTime>,
}

/// Index the backend maintains on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpec {
    /// At most one document per value of `field`.
    Unique { field: &'static str },
    /// Documents are purged `expire_after` past the instant stored in `field`.
    Ttl {
        field: &'static str,
        expire_after: Duration,
    },
}

/// Errors raised by a collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// An insert violated a unique index.
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    /// The collection could not be reached.
    #[error("collection unavailable: {0}")]
    Unavailable(String),
}

/// Minimal document-store surface the adapter needs.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Create an index if it does not exist yet.
    async fn ensure_index(&self, spec: IndexSpec) -> Result<(), CollectionError>;

    /// First document whose id matches.
    async fn find_one(&self, id: &str) -> Result<Option<Document>, CollectionError>;

    /// Version of the first matching document, projected without the payload.
    async fn find_version(&self, id: &str) -> Result<Option<i64>, CollectionError>;

    /// Number of documents whose id matches.
    async fn count(&self, id: &str) -> Result<u64, CollectionError>;

    /// Update the first matching document or insert a new one.
    async fn upsert(&self, id: &str, update: DocumentUpdate) -> Result<(), CollectionError>;

    /// Insert a new document.
    async fn insert(&self, document: Document) -> Result<(), CollectionError>;

    /// Remove every matching document, returning how many were removed.
    async fn remove(&self, id: &str) -> Result<u64, CollectionError>;
}
