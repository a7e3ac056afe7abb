//! The key-value client contract.
//!
//! A client is the composition of two capabilities:
//! - [`Lifecycle`]: connect, disconnect, liveness
//! - [`VersionedStore`]: versioned, TTL-aware data operations
//!
//! Every adapter implements both; [`KvsClient`] is implemented for anything
//! that does. There is no compare-and-swap: the version is caller-maintained
//! metadata and `add` (create-if-absent) is the only atomic primitive.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::ttl::Ttl;

/// Connection lifecycle of a client.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Connect to the backend.
    ///
    /// Idempotent: an already-established client tears its connection down
    /// and re-creates it instead of failing.
    async fn establish(&self) -> Result<()>;

    /// Disconnect. Safe to call when already shut down.
    async fn shutdown(&self) -> Result<()>;

    /// Whether the client is currently established. No side effects.
    fn is_alive(&self) -> bool;
}

/// Versioned record operations.
///
/// All operations fail with `NotEstablished` outside the established state
/// without contacting the backend, with `Connection` on transport faults and
/// with `Timeout` when the configured deadline passes.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Fetch a payload. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Check for a key without transferring its payload.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Unconditional upsert.
    ///
    /// A `None` payload is a metadata-only update: the stored payload is left
    /// untouched while the version and expiry are replaced.
    async fn set(&self, key: &str, version: i64, payload: Option<&[u8]>, ttl: Ttl)
    -> Result<bool>;

    /// Create the record only if the key is absent.
    ///
    /// Returns `false` without modifying anything if the key already exists.
    async fn add(&self, key: &str, version: i64, payload: &[u8], ttl: Ttl) -> Result<bool>;

    /// Remove a record. Returns true if something was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Stored version of a record, `0` if the key is absent.
    async fn version(&self, key: &str) -> Result<i64>;

    /// [`VersionedStore::set`] with a record that never expires.
    async fn set_forever(&self, key: &str, version: i64, payload: Option<&[u8]>) -> Result<bool> {
        self.set(key, version, payload, Ttl::FOREVER).await
    }

    /// [`VersionedStore::add`] with a record that never expires.
    async fn add_forever(&self, key: &str, version: i64, payload: &[u8]) -> Result<bool> {
        self.add(key, version, payload, Ttl::FOREVER).await
    }

    /// Stored version, with any failure reported as `0`.
    ///
    /// Callers cannot tell "absent", "version 0" and "lookup failed" apart.
    async fn version_or_zero(&self, key: &str) -> i64 {
        match self.version(key).await {
            Ok(version) => version,
            Err(e) => {
                warn!(key = %key, error = %e, "Version lookup failed, reporting 0");
                0
            }
        }
    }
}

/// A complete key-value client.
pub trait KvsClient: Lifecycle + VersionedStore {}

impl<T: Lifecycle + VersionedStore + ?Sized> KvsClient for T {}
