//! Injected metrics registry.
//!
//! The instrumented client publishes its [`MetricsView`] here on
//! `establish` and withdraws it on `shutdown`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::counters::{MetricsSnapshot, MetricsView};
use crate::error::{RegistryError, Result};
use crate::name::MetricsName;

/// Introspection registry for metrics views.
pub trait MetricsRegistry: Send + Sync {
    /// Publish `view` under `name`.
    fn register(&self, name: &MetricsName, view: Arc<dyn MetricsView>) -> Result<()>;

    /// Withdraw whatever is published under `name`.
    fn deregister(&self, name: &MetricsName) -> Result<()>;
}

/// Registry that accepts everything and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl MetricsRegistry for NoopRegistry {
    fn register(&self, _name: &MetricsName, _view: Arc<dyn MetricsView>) -> Result<()> {
        Ok(())
    }

    fn deregister(&self, _name: &MetricsName) -> Result<()> {
        Ok(())
    }
}

/// Registry that keeps views in a map and can snapshot them on demand.
///
/// Registering a name twice or withdrawing an unknown name is an error.
#[derive(Default)]
pub struct InMemoryRegistry {
    views: RwLock<BTreeMap<MetricsName, Arc<dyn MetricsView>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered names, in order.
    pub fn names(&self) -> Vec<MetricsName> {
        self.views.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &MetricsName) -> bool {
        self.views.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }

    /// Snapshot the view registered under `name`.
    pub fn snapshot(&self, name: &MetricsName) -> Option<MetricsSnapshot> {
        self.views.read().get(name).map(|v| v.snapshot())
    }

    /// Snapshot every registered view.
    pub fn snapshots(&self) -> Vec<(MetricsName, MetricsSnapshot)> {
        self.views
            .read()
            .iter()
            .map(|(name, view)| (name.clone(), view.snapshot()))
            .collect()
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl MetricsRegistry for InMemoryRegistry {
    fn register(&self, name: &MetricsName, view: Arc<dyn MetricsView>) -> Result<()> {
        let mut views = self.views.write();
        if views.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.clone()));
        }
        views.insert(name.clone(), view);
        debug!(name = %name, "Metrics registered");
        Ok(())
    }

    fn deregister(&self, name: &MetricsName) -> Result<()> {
        match self.views.write().remove(name) {
            Some(_) => {
                debug!(name = %name, "Metrics deregistered");
                Ok(())
            }
            None => Err(RegistryError::NotRegistered(name.clone())),
        }
    }
}
