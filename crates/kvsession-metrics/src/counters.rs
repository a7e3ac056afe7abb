//! Lock-free storage counters and their read-only snapshot.
//!
//! Counters are monotonic for the lifetime of the process and are never
//! reset. Times are accumulated in microseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Which counter a successful call is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `get`, `exists`, `version`
    Read,
    /// `add`
    Insert,
    /// `set`
    Update,
    /// `delete`
    Delete,
}

#[derive(Debug, Default)]
struct Counter {
    count: AtomicU64,
    micros: AtomicU64,
}

impl Counter {
    fn record(&self, elapsed: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn time(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Relaxed))
    }
}

/// Counters owned by one instrumented client.
#[derive(Debug, Default)]
pub struct StorageMetrics {
    reads: Counter,
    inserts: Counter,
    updates: Counter,
    deletes: Counter,
    errors: Counter,
    data_in: AtomicU64,
    data_out: AtomicU64,
}

impl StorageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge a successful call to the counter for `operation`.
    pub fn record_success(&self, operation: Operation, elapsed: Duration) {
        match operation {
            Operation::Read => self.reads.record(elapsed),
            Operation::Insert => self.inserts.record(elapsed),
            Operation::Update => self.updates.record(elapsed),
            Operation::Delete => self.deletes.record(elapsed),
        }
    }

    /// Charge a failed call to the error counter.
    pub fn record_error(&self, elapsed: Duration) {
        self.errors.record(elapsed);
    }

    /// Bytes received from the backend.
    pub fn add_data_in(&self, bytes: usize) {
        self.data_in.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Bytes sent to the backend.
    pub fn add_data_out(&self, bytes: usize) {
        self.data_out.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data_in_bytes = self.data_in.load(Ordering::Relaxed);
        let data_out_bytes = self.data_out.load(Ordering::Relaxed);
        MetricsSnapshot {
            reads: self.reads.count(),
            writes: self.inserts.count() + self.updates.count() + self.deletes.count(),
            inserts: self.inserts.count(),
            updates: self.updates.count(),
            deletes: self.deletes.count(),
            errors: self.errors.count(),
            read_time: self.reads.time(),
            write_time: self.inserts.time() + self.updates.time() + self.deletes.time(),
            insert_time: self.inserts.time(),
            update_time: self.updates.time(),
            delete_time: self.deletes.time(),
            error_time: self.errors.time(),
            data_in_bytes,
            data_out_bytes,
            data_in_kib: data_in_bytes / 1024,
            data_out_kib: data_out_bytes / 1024,
        }
    }
}

/// Read-only view of a client's metrics, as handed to a registry.
pub trait MetricsView: Send + Sync {
    fn snapshot(&self) -> MetricsSnapshot;
}

impl MetricsView for StorageMetrics {
    fn snapshot(&self) -> MetricsSnapshot {
        StorageMetrics::snapshot(self)
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Counter values at one instant. Times serialize as milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    /// `inserts + updates + deletes`
    pub writes: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub errors: u64,
    #[serde(rename = "read_time_ms", serialize_with = "as_millis")]
    pub read_time: Duration,
    #[serde(rename = "write_time_ms", serialize_with = "as_millis")]
    pub write_time: Duration,
    #[serde(rename = "insert_time_ms", serialize_with = "as_millis")]
    pub insert_time: Duration,
    #[serde(rename = "update_time_ms", serialize_with = "as_millis")]
    pub update_time: Duration,
    #[serde(rename = "delete_time_ms", serialize_with = "as_millis")]
    pub delete_time: Duration,
    #[serde(rename = "error_time_ms", serialize_with = "as_millis")]
    pub error_time: Duration,
    pub data_in_bytes: u64,
    pub data_out_bytes: u64,
    /// Whole kibibytes received.
    pub data_in_kib: u64,
    /// Whole kibibytes sent.
    pub data_out_kib: u64,
}
