//! Write-through local session cache over a versioned key-value client.
//!
//! This crate provides:
//! - A concurrent map of resident sessions, served without backend round trips
//! - Write deduplication by attribute digest (metadata-only writes)
//! - A cancellable reconciliation check per resident session that converges
//!   with the backend's authoritative version
//!
//! # Example
//!
//! ```rust,ignore
//! use kvsession_cache::{CacheConfig, LocalCache};
//! use kvsession_client::{MemoryClient, MemoryStore};
//!
//! let cache = LocalCache::new(MemoryClient::new(MemoryStore::new()), CacheConfig::default());
//! cache.start().await?;
//!
//! let session = cache.create(&kvsession_cache::new_session_id()).await?;
//! session.write().set_attribute("user", "alice");
//! cache.save(&session).await?;
//! ```

mod cache;
mod config;
mod error;
mod reconciler;
mod session;

pub use cache::{CacheEntry, CacheStats, LocalCache};
pub use config::{
    CacheConfig, DEFAULT_RECONCILE_BUFFER, DEFAULT_RECONCILE_WORKERS, DEFAULT_SESSION_TTL,
};
pub use error::{Error, Result};
pub use reconciler::ReconcileOutcome;
pub use session::{Attributes, SessionData, SessionHandle, attribute_digest, new_session_id};
