//! Metrics instrumentation for kvsession clients.
//!
//! [`InstrumentedClient`] decorates any [`KvsClient`](kvsession_client::KvsClient)
//! with lock-free counters and publishes a read-only [`MetricsView`] under a
//! `category:type:name` identifier to an injected [`MetricsRegistry`].

mod client;
mod counters;
mod error;
mod name;
mod registry;

pub use client::InstrumentedClient;
pub use counters::{MetricsSnapshot, MetricsView, Operation, StorageMetrics};
pub use error::{RegistryError, Result};
pub use name::{DEFAULT_CATEGORY, MetricsName};
pub use registry::{InMemoryRegistry, MetricsRegistry, NoopRegistry};
