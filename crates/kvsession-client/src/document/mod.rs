//! Document-store adapter.

mod client;
mod collection;
mod memory;

pub use client::DocumentClient;
pub use collection::{
    CollectionError, Document, DocumentCollection, DocumentUpdate, FIELD_EXPIRY, FIELD_ID,
    FIELD_SESSION, FIELD_VERSION, IndexSpec,
};
pub use memory::{DEFAULT_TTL_MONITOR_INTERVAL, MemoryCollection};
