//! Session data model.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kvsession_transcoder::{Transcoder, TranscoderError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Session attributes, sorted by name so their encoding is deterministic.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Shared, mutable handle to a resident session.
///
/// Reconciliation replaces the contents in place, so every holder of the
/// handle sees a refreshed session.
pub type SessionHandle = Arc<RwLock<SessionData>>;

/// A session as stored on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Application-facing session id.
    pub id: String,

    /// Caller-maintained version, bumped on every save.
    pub version: i64,

    pub created_at: DateTime<Utc>,

    pub accessed_at: DateTime<Utc>,

    pub attributes: Attributes,
}

impl SessionData {
    /// Create an empty session at version 0.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            version: 0,
            created_at: now,
            accessed_at: now,
            attributes: Attributes::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<serde_json::Value> {
        self.attributes.remove(name)
    }

    /// Record an access.
    pub fn touch(&mut self) {
        self.accessed_at = Utc::now();
    }

    pub(crate) fn into_handle(self) -> SessionHandle {
        Arc::new(RwLock::new(self))
    }
}

/// Generate a fresh session id (lowercase UUID v4).
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SHA-256 hex digest of the transcoded attributes.
///
/// Only attributes take part; id, version and timestamps do not, so two
/// saves of the same attribute content produce the same digest.
pub fn attribute_digest<T: Transcoder>(
    transcoder: &T,
    attributes: &Attributes,
) -> std::result::Result<String, TranscoderError> {
    let bytes = transcoder.encode(attributes)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
