//! Smoke command - run the end-to-end session scenarios in process.
//!
//! The backend lives in this process on a manual clock, so expiry is
//! simulated by advancing time instead of waiting for it.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use kvsession_cache::{CacheConfig, LocalCache, new_session_id};
use kvsession_client::document::DEFAULT_TTL_MONITOR_INTERVAL;
use kvsession_client::{
    ClientConfig, ClientError, DocumentClient, KvsClient, Lifecycle, ManualClock, MemoryClient,
    MemoryCollection, MemoryStore, Ttl, VersionedStore,
};
use kvsession_config::BackendKind;
use kvsession_metrics::{
    InMemoryRegistry, InstrumentedClient, MetricsName, MetricsRegistry, MetricsSnapshot,
    NoopRegistry,
};

use super::Context;

/// Arguments for the smoke command.
#[derive(Args, Debug)]
pub struct SmokeArgs {
    /// Backend adapter to exercise: memory or document (defaults to the configured one)
    #[arg(long)]
    pub backend: Option<BackendKind>,
}

/// Outcome of one scenario.
#[derive(Debug, Serialize)]
struct Step {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl Step {
    fn check(name: &'static str, passed: bool, detail: String) -> Self {
        debug!(step = name, passed, %detail, "Smoke step finished");
        Self {
            name,
            passed,
            detail,
        }
    }
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    backend: BackendKind,
    metrics_name: String,
    published: bool,
    steps: Vec<Step>,
    metrics: MetricsSnapshot,
}

impl SmokeReport {
    fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed).count()
    }
}

/// Run the smoke command.
pub async fn run(args: SmokeArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config.config;
    let client_section = config.client();
    let backend = args.backend.unwrap_or(client_section.backend);
    let client_config = client_section.to_client_config();
    let cache_config = config.cache().to_cache_config();
    let metrics = config.metrics();

    let registry = Arc::new(InMemoryRegistry::new());
    let sink: Arc<dyn MetricsRegistry> = if metrics.enabled {
        registry.clone() as Arc<dyn MetricsRegistry>
    } else {
        Arc::new(NoopRegistry)
    };
    let name = MetricsName::session(backend.as_str(), client_config.server.clone())
        .with_category(metrics.category);
    let clock = Arc::new(ManualClock::new(SystemTime::now()));

    info!(backend = %backend, name = %name, "Running smoke scenarios");

    let mut report = match backend {
        BackendKind::Memory => {
            let store = MemoryStore::with_clock(clock.clone());
            let client = MemoryClient::with_config(store.clone(), client_config.clone());
            let instrumented = InstrumentedClient::new(client, sink, name);
            run_scenarios(backend, instrumented, cache_config, &registry, &clock, || {
                store.purge_expired();
            })
            .await?
        }
        BackendKind::Document => {
            let collection =
                MemoryCollection::with_clock(clock.clone(), DEFAULT_TTL_MONITOR_INTERVAL);
            let client =
                DocumentClient::with_clock(collection.clone(), client_config.clone(), clock.clone());
            let instrumented = InstrumentedClient::new(client, sink, name);
            run_scenarios(backend, instrumented, cache_config, &registry, &clock, || {
                collection.purge_expired();
            })
            .await?
        }
    };
    report.steps.push(failing_backend(client_config).await?);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let failures = report.failures();
    if failures > 0 {
        bail!("{} smoke step(s) failed", failures);
    }
    Ok(())
}

async fn run_scenarios<C: KvsClient + 'static>(
    backend: BackendKind,
    client: InstrumentedClient<C>,
    cache_config: CacheConfig,
    registry: &InMemoryRegistry,
    clock: &ManualClock,
    expire: impl Fn(),
) -> Result<SmokeReport> {
    let cache = LocalCache::new(client, cache_config);
    cache.start().await?;
    let kv = cache.client();
    let mut steps = Vec::new();

    let added = kv.add_forever("s1", 1, b"hello").await?;
    let got = kv.get("s1").await?;
    steps.push(Step::check(
        "add then get",
        added && got.as_deref() == Some(b"hello".as_slice()),
        format!("add={} get={}", added, render(&got)),
    ));

    let added = kv.add_forever("s1", 2, b"world").await?;
    let got = kv.get("s1").await?;
    steps.push(Step::check(
        "add over existing key",
        !added && got.as_deref() == Some(b"hello".as_slice()),
        format!("add={} get={}", added, render(&got)),
    ));

    let stored = kv.set("s1", 3, Some(b"world"), Ttl::from_raw(5)).await?;
    clock.advance(Duration::from_secs(6));
    expire();
    let got = kv.get("s1").await?;
    steps.push(Step::check(
        "set with ttl expires",
        stored && got.is_none(),
        format!("set={} get after 6s={}", stored, render(&got)),
    ));

    let version = kv.version("missing").await?;
    steps.push(Step::check(
        "version of missing key",
        version == 0,
        format!("version={}", version),
    ));

    let session = cache.create(&new_session_id()).await?;
    session.write().set_attribute("user", "alice");
    let start = kv.snapshot().data_out_bytes;
    cache.save(&session).await?;
    let after_first = kv.snapshot().data_out_bytes;
    cache.save(&session).await?;
    let after_second = kv.snapshot().data_out_bytes;
    let (first, second) = (after_first - start, after_second - after_first);
    let version = session.read().version;
    steps.push(Step::check(
        "identical save is metadata only",
        first > 0 && second == 0 && version == 3,
        format!("first={}B second={}B version={}", first, second, version),
    ));

    let name = kv.name().clone();
    let metrics = kv.snapshot();
    let published = registry
        .snapshots()
        .into_iter()
        .any(|(registered, snapshot)| registered == name && snapshot == metrics);
    cache.shutdown().await?;

    Ok(SmokeReport {
        backend,
        metrics_name: name.to_string(),
        published,
        steps,
        metrics,
    })
}

async fn failing_backend(config: ClientConfig) -> Result<Step> {
    let store = MemoryStore::new();
    let client = InstrumentedClient::new(
        MemoryClient::with_config(store.clone(), config),
        Arc::new(NoopRegistry),
        MetricsName::session("memory", "unavailable"),
    );
    client.establish().await?;
    store.set_unavailable(true);

    let result = client.get("s1").await;
    let snapshot = client.snapshot();
    client.shutdown().await?;

    Ok(Step::check(
        "failing backend counts one error",
        matches!(result, Err(ClientError::Connection { .. })) && snapshot.errors == 1,
        format!(
            "errors={} error_time={:?}",
            snapshot.errors, snapshot.error_time
        ),
    ))
}

fn render(payload: &Option<Vec<u8>>) -> String {
    match payload {
        Some(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        None => "none".to_string(),
    }
}

fn print_report(report: &SmokeReport) {
    println!("# kvsession smoke ({})\n", report.backend);

    for step in &report.steps {
        let status = if step.passed { "✓" } else { "✗" };
        println!("  {} {:<34} {}", status, step.name, step.detail);
    }
    println!();

    let m = &report.metrics;
    let published = if report.published {
        "published"
    } else {
        "not published"
    };
    println!("Metrics {} ({}):", report.metrics_name, published);
    println!(
        "  reads:   {:>6}  {:>8.3}ms",
        m.reads,
        m.read_time.as_secs_f64() * 1000.0
    );
    println!(
        "  writes:  {:>6}  {:>8.3}ms  (inserts {}, updates {}, deletes {})",
        m.writes,
        m.write_time.as_secs_f64() * 1000.0,
        m.inserts,
        m.updates,
        m.deletes
    );
    println!(
        "  errors:  {:>6}  {:>8.3}ms",
        m.errors,
        m.error_time.as_secs_f64() * 1000.0
    );
    println!(
        "  data:    in {} B ({} KiB), out {} B ({} KiB)",
        m.data_in_bytes, m.data_in_kib, m.data_out_bytes, m.data_out_kib
    );
}
