//! Metrics-instrumenting decorator.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use kvsession_client::{KvsClient, Lifecycle, Result, Ttl, VersionedStore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::counters::{MetricsSnapshot, MetricsView, Operation, StorageMetrics};
use crate::name::MetricsName;
use crate::registry::MetricsRegistry;

/// Wraps a client and records every call it makes.
///
/// Successful calls are charged to reads, inserts, updates or deletes;
/// failed calls to errors. Failures are returned exactly as the delegate
/// produced them. The metrics view is published to the injected registry on
/// `establish` and withdrawn on `shutdown`; registry failures are logged and
/// otherwise ignored.
pub struct InstrumentedClient<C> {
    delegate: C,
    metrics: Arc<StorageMetrics>,
    registry: Arc<dyn MetricsRegistry>,
    name: MetricsName,
    registered: AtomicBool,
}

impl<C: KvsClient> InstrumentedClient<C> {
    /// Wrap `delegate`, publishing its metrics under `name`.
    pub fn new(delegate: C, registry: Arc<dyn MetricsRegistry>, name: MetricsName) -> Self {
        Self {
            delegate,
            metrics: Arc::new(StorageMetrics::new()),
            registry,
            name,
            registered: AtomicBool::new(false),
        }
    }

    /// Wrap `delegate` under `SessionClustering:<kind>:<server>`.
    pub fn for_backend(
        delegate: C,
        registry: Arc<dyn MetricsRegistry>,
        kind: &str,
        server: &str,
    ) -> Self {
        Self::new(delegate, registry, MetricsName::session(kind, server))
    }

    pub fn name(&self) -> &MetricsName {
        &self.name
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// Shared handle to the live counters.
    pub fn metrics(&self) -> Arc<StorageMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn track<T>(
        &self,
        operation: Operation,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = call.await;
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => self.metrics.record_success(operation, elapsed),
            Err(e) => {
                debug!(?operation, error = %e, elapsed_us = elapsed.as_micros() as u64, "Backend call failed");
                self.metrics.record_error(elapsed);
            }
        }
        result
    }

    fn register(&self) {
        if self.registered.load(Ordering::Acquire) {
            return;
        }
        let view: Arc<dyn MetricsView> = self.metrics.clone();
        match self.registry.register(&self.name, view) {
            Ok(()) => self.registered.store(true, Ordering::Release),
            Err(e) => warn!(name = %self.name, error = %e, "Failed to register metrics"),
        }
    }

    fn deregister(&self) {
        if !self.registered.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.registry.deregister(&self.name) {
            warn!(name = %self.name, error = %e, "Failed to deregister metrics");
        }
    }
}

#[async_trait]
impl<C: KvsClient> Lifecycle for InstrumentedClient<C> {
    async fn establish(&self) -> Result<()> {
        self.delegate.establish().await?;
        self.register();
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.deregister();
        self.delegate.shutdown().await
    }

    fn is_alive(&self) -> bool {
        self.delegate.is_alive()
    }
}

#[async_trait]
impl<C: KvsClient> VersionedStore for InstrumentedClient<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let payload = self.track(Operation::Read, self.delegate.get(key)).await?;
        if let Some(bytes) = &payload {
            self.metrics.add_data_in(bytes.len());
        }
        Ok(payload)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.track(Operation::Read, self.delegate.exists(key)).await
    }

    async fn set(
        &self,
        key: &str,
        version: i64,
        payload: Option<&[u8]>,
        ttl: Ttl,
    ) -> Result<bool> {
        let stored = self
            .track(
                Operation::Update,
                self.delegate.set(key, version, payload, ttl),
            )
            .await?;
        self.metrics.add_data_out(payload.map_or(0, <[u8]>::len));
        Ok(stored)
    }

    async fn add(&self, key: &str, version: i64, payload: &[u8], ttl: Ttl) -> Result<bool> {
        let added = self
            .track(
                Operation::Insert,
                self.delegate.add(key, version, payload, ttl),
            )
            .await?;
        self.metrics.add_data_out(payload.len());
        Ok(added)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.track(Operation::Delete, self.delegate.delete(key)).await
    }

    async fn version(&self, key: &str) -> Result<i64> {
        self.track(Operation::Read, self.delegate.version(key)).await
    }
}
