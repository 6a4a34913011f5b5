//! Run metrics via the `metrics` facade.
//!
//! Nothing is recorded unless a recorder is installed; the CLI installs
//! [`CliRecorder`] with `--metrics` and prints its contents after the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;

use crate::process::{SPAWN_FAILURE_RC, TIMEOUT_RC};
use crate::result::RunResult;

/// Coarse outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Ok,
    Failed,
    Timeout,
    SpawnFailed,
}

impl RunOutcome {
    #[must_use]
    pub const fn of(result: &RunResult) -> Self {
        match result.rc {
            0 => Self::Ok,
            TIMEOUT_RC => Self::Timeout,
            SPAWN_FAILURE_RC => Self::SpawnFailed,
            _ => Self::Failed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::SpawnFailed => "spawn_failed",
        }
    }
}

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "wbench_runs_total",
        Unit::Count,
        "Workload executions by variant and outcome"
    );
    describe_counter!(
        "wbench_cache_hits_total",
        Unit::Count,
        "Precompiled artifacts reused"
    );
    describe_counter!(
        "wbench_cache_misses_total",
        Unit::Count,
        "Precompiled artifacts compiled"
    );
    describe_counter!(
        "wbench_unmeasured_total",
        Unit::Count,
        "Successful runs without a usable metric"
    );
    describe_counter!(
        "wbench_pruned_variants_total",
        Unit::Count,
        "Variants dropped by preflight"
    );
    describe_gauge!("wbench_workloads", Unit::Count, "Workloads selected");
    describe_gauge!("wbench_variants", Unit::Count, "Variants selected");
    describe_histogram!(
        "wbench_run_wall_ms",
        Unit::Milliseconds,
        "Wall-clock time per run"
    );
}

/// Record one finished run.
pub fn record_run(result: &RunResult) {
    let variant = result.key();
    let outcome = RunOutcome::of(result);
    counter!(
        "wbench_runs_total",
        "variant" => variant.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    if result.ok && result.metric_ms.is_none() {
        counter!("wbench_unmeasured_total", "variant" => variant.clone()).increment(1);
    }
    match result.cache_hit {
        Some(true) => {
            counter!("wbench_cache_hits_total", "variant" => variant.clone()).increment(1);
        }
        Some(false) => {
            counter!("wbench_cache_misses_total", "variant" => variant.clone()).increment(1);
        }
        None => {}
    }
    histogram!("wbench_run_wall_ms", "variant" => variant).record(result.wall_ms);
}

/// Record the run matrix dimensions and preflight pruning.
#[allow(clippy::cast_precision_loss)]
pub fn record_plan(workloads: usize, variants: usize, pruned: usize) {
    gauge!("wbench_workloads").set(workloads as f64);
    gauge!("wbench_variants").set(variants as f64);
    counter!("wbench_pruned_variants_total").absolute(u64::try_from(pruned).unwrap_or(u64::MAX));
}

#[derive(Default)]
struct Store {
    counters: RwLock<BTreeMap<String, u64>>,
    gauges: RwLock<BTreeMap<String, f64>>,
    histograms: RwLock<BTreeMap<String, Vec<f64>>>,
}

struct Handle {
    key: String,
    store: Arc<Store>,
}

impl metrics::CounterFn for Handle {
    fn increment(&self, value: u64) {
        *self.store.counters.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.store.counters.write().insert(self.key.clone(), value);
    }
}

impl metrics::GaugeFn for Handle {
    fn increment(&self, value: f64) {
        *self.store.gauges.write().entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        *self.store.gauges.write().entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        self.store.gauges.write().insert(self.key.clone(), value);
    }
}

impl metrics::HistogramFn for Handle {
    fn record(&self, value: f64) {
        self.store
            .histograms
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

/// In-memory recorder for terminal output.
#[derive(Default)]
pub struct CliRecorder {
    store: Arc<Store>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder; `None` if one is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let store = Arc::clone(&self.store);
        metrics::set_global_recorder(self).ok()?;
        Some(CliRecorderHandle { store })
    }

    fn handle(&self, key: &Key) -> Arc<Handle> {
        Arc::new(Handle {
            key: key_to_string(key),
            store: Arc::clone(&self.store),
        })
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

/// Access to metrics recorded by an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    store: Arc<Store>,
}

impl CliRecorderHandle {
    /// Print all collected metrics, sorted by key.
    #[allow(clippy::cast_precision_loss)]
    pub fn print_summary(&self) {
        let counters = self.store.counters.read();
        let gauges = self.store.gauges.read();
        let histograms = self.store.histograms.read();

        if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        if !counters.is_empty() {
            println!();
            println!("### Counters");
            for (key, value) in counters.iter() {
                println!("  {key}: {value}");
            }
        }
        if !gauges.is_empty() {
            println!();
            println!("### Gauges");
            for (key, value) in gauges.iter() {
                println!("  {key}: {value:.3}");
            }
        }
        if !histograms.is_empty() {
            println!();
            println!("### Histograms");
            for (key, values) in histograms.iter().filter(|(_, v)| !v.is_empty()) {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                println!(
                    "  {key}: count={}, min={min:.3}, max={max:.3}, avg={avg:.3}",
                    values.len()
                );
            }
        }
        println!();
    }
}
