use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use wbench_corpus::{WorkloadFilter, WorkloadKind};
use wbench_engine::{Engine, Mode, Runtime};

use crate::metric::MetricPolicy;

/// Default corpus root.
pub const DEFAULT_ROOT: &str = "wasm/corpus";
/// Default per-run timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);
/// Default result artifact path.
pub const DEFAULT_OUT: &str = "logs/results.json";
/// Baseline preferred when none is given and it is available.
pub const PREFERRED_BASELINE: &str = "wasm3:int:full";

/// Options for a benchmark run.
#[derive(Clone, Debug)]
pub struct BenchOptions {
    /// Engines to benchmark, in selection order.
    pub engines: Vec<Engine>,
    /// Explicit `[label=]path` specs per engine.
    pub bins: BTreeMap<Engine, Vec<String>>,
    /// Environment-provided spec lists per engine.
    pub env_bins: BTreeMap<Engine, String>,
    pub runtimes: Vec<Runtime>,
    pub modes: Vec<Mode>,
    /// Corpus root.
    pub root: PathBuf,
    /// Per-run timeout.
    pub timeout: Duration,
    /// Maximum number of workloads (0 = all).
    pub max_workloads: usize,
    pub kinds: BTreeSet<WorkloadKind>,
    /// Tag filter (OR semantics).
    pub tags: BTreeSet<String>,
    /// Baseline key (default prefers [`PREFERRED_BASELINE`]).
    pub baseline: Option<String>,
    pub metric: MetricPolicy,
    /// Result artifact path.
    pub out: PathBuf,
    /// Probe engines that can reject configurations before measuring.
    pub preflight: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            engines: Vec::new(),
            bins: BTreeMap::new(),
            env_bins: BTreeMap::new(),
            runtimes: Vec::new(),
            modes: Vec::new(),
            root: PathBuf::from(DEFAULT_ROOT),
            timeout: DEFAULT_TIMEOUT,
            max_workloads: 0,
            kinds: BTreeSet::new(),
            tags: BTreeSet::new(),
            baseline: None,
            metric: MetricPolicy::default(),
            out: PathBuf::from(DEFAULT_OUT),
            preflight: true,
        }
    }
}

impl BenchOptions {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an engine (ignored if already selected).
    #[must_use]
    pub fn with_engine(mut self, engine: Engine) -> Self {
        if !self.engines.contains(&engine) {
            self.engines.push(engine);
        }
        self
    }

    /// Add several engines.
    #[must_use]
    pub fn with_engines(self, engines: impl IntoIterator<Item = Engine>) -> Self {
        engines.into_iter().fold(self, Self::with_engine)
    }

    /// Add an explicit `[label=]path` binary spec for an engine.
    #[must_use]
    pub fn with_bin(mut self, engine: Engine, spec: impl Into<String>) -> Self {
        self.bins.entry(engine).or_default().push(spec.into());
        self
    }

    /// Set the environment-style spec list for an engine.
    #[must_use]
    pub fn with_env_bins(mut self, engine: Engine, value: impl Into<String>) -> Self {
        self.env_bins.insert(engine, value.into());
        self
    }

    /// Read `WBENCH_<ENGINE>_BIN` for every engine from the process environment.
    #[must_use]
    pub fn with_process_env(mut self) -> Self {
        for &engine in Engine::ALL {
            if let Ok(value) = std::env::var(engine.env_var()) {
                self.env_bins.insert(engine, value);
            }
        }
        self
    }

    /// Add a runtime (duplicates ignored).
    #[must_use]
    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        if !self.runtimes.contains(&runtime) {
            self.runtimes.push(runtime);
        }
        self
    }

    /// Add a mode (duplicates ignored).
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        if !self.modes.contains(&mode) {
            self.modes.push(mode);
        }
        self
    }

    /// Set the corpus root.
    #[must_use]
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Set the per-run timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap the number of workloads (0 = all).
    #[must_use]
    pub const fn with_max_workloads(mut self, max: usize) -> Self {
        self.max_workloads = max;
        self
    }

    /// Keep only workloads of the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = WorkloadKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Keep only workloads carrying any of the given tags.
    #[must_use]
    pub fn with_tags<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(
            tags.into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        self
    }

    /// Set the baseline configuration key.
    #[must_use]
    pub fn with_baseline(mut self, baseline: impl Into<String>) -> Self {
        let baseline = baseline.into();
        self.baseline = (!baseline.trim().is_empty()).then(|| baseline.trim().to_string());
        self
    }

    /// Set the metric policy.
    #[must_use]
    pub const fn with_metric(mut self, metric: MetricPolicy) -> Self {
        self.metric = metric;
        self
    }

    /// Set the result artifact path.
    #[must_use]
    pub fn with_out(mut self, out: impl AsRef<Path>) -> Self {
        self.out = out.as_ref().to_path_buf();
        self
    }

    /// Enable or disable the preflight probe.
    #[must_use]
    pub const fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    /// Workload filter built from the kind, tag and count options.
    #[must_use]
    pub fn workload_filter(&self) -> WorkloadFilter {
        WorkloadFilter::new()
            .with_kinds(self.kinds.iter().copied())
            .with_tags(&self.tags)
            .with_max(self.max_workloads)
    }

    /// Binary specs for an engine: explicit specs and the environment value.
    #[must_use]
    pub fn bin_specs(&self, engine: Engine) -> (&[String], Option<&str>) {
        (
            self.bins.get(&engine).map_or(&[][..], Vec::as_slice),
            self.env_bins.get(&engine).map(String::as_str),
        )
    }
}
