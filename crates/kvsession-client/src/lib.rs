//! Versioned key-value client contract for session storage.
//!
//! This crate provides:
//! - The [`Lifecycle`] + [`VersionedStore`] capabilities every backend implements
//! - The memcached-style [`Ttl`] encoding
//! - Per-call deadlines and a shared error taxonomy
//! - An in-process adapter ([`MemoryClient`]) and a document-store adapter
//!   ([`DocumentClient`])
//!
//! # Example
//!
//! ```rust,ignore
//! use kvsession_client::{Lifecycle, MemoryClient, MemoryStore, VersionedStore};
//!
//! let client = MemoryClient::new(MemoryStore::new());
//! client.establish().await?;
//! client.add_forever("s1", 1, b"hello").await?;
//! ```

mod clock;
mod config;
mod deadline;
pub mod document;
mod error;
mod lifecycle;
mod memory;
mod store;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, DEFAULT_SERVER, DEFAULT_TIMEOUT};
pub use deadline::with_deadline;
pub use document::{DocumentClient, DocumentCollection, MemoryCollection};
pub use error::{BoxError, ClientError, Result};
pub use lifecycle::{ClientState, LifecycleCell};
pub use memory::{MemoryClient, MemoryStore, StoreEntry};
pub use store::{KvsClient, Lifecycle, VersionedStore};
pub use ttl::{RELATIVE_TTL_LIMIT, Ttl, TtlKind};
