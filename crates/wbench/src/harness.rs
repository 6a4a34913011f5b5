//! Run orchestration.
//!
//! [`Harness::prepare`] validates the whole configuration (engines, corpus,
//! binaries, variants, baseline) before anything is measured. [`Harness::run`]
//! then executes every (workload, variant) pair sequentially, one process at
//! a time, and records each outcome; individual failures never abort the run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use wbench_corpus::{Workload, load_corpus};
use wbench_engine::{
    CapabilityProbe, CliDialect, Engine, EngineVariant, build_command, resolve_bins,
    supported_variants, uses_precompile,
};

use crate::cache::PrecompileCache;
use crate::error::{ConfigError, Result};
use crate::metric::{MetricExtractor, TimeLineExtractor};
use crate::options::{BenchOptions, PREFERRED_BASELINE};
use crate::probe::{HelpTextProbe, preflight};
use crate::process::run_with_timeout;
use crate::result::RunResult;

/// Progress notification delivered after each run.
#[derive(Debug, Clone, Copy)]
pub struct RunEvent<'a> {
    /// 1-based position in the run matrix.
    pub index: usize,
    pub total: usize,
    pub workload: &'a Workload,
    pub variant: &'a EngineVariant,
    pub result: &'a RunResult,
}

/// A validated benchmark run, ready to execute.
pub struct Harness {
    options: BenchOptions,
    root: PathBuf,
    workloads: Vec<Workload>,
    variants: Vec<EngineVariant>,
    baseline: String,
    skipped_engines: Vec<Engine>,
    pruned_variants: Vec<String>,
    warnings: Vec<String>,
    cache: PrecompileCache,
    extractor: Box<dyn MetricExtractor>,
}

impl Harness {
    /// Validate `options` and resolve the run matrix, probing dialects via
    /// each binary's usage text.
    ///
    /// # Errors
    /// Returns a configuration error if anything needed to measure is
    /// missing or inconsistent.
    pub fn prepare(options: BenchOptions) -> Result<Self> {
        let root = std::path::absolute(&options.root).unwrap_or_else(|_| options.root.clone());
        let probe = HelpTextProbe::new(&root);
        Self::prepare_with_probe(options, &probe)
    }

    /// Like [`Self::prepare`], with a caller-supplied dialect probe.
    ///
    /// # Errors
    /// Returns a configuration error if anything needed to measure is
    /// missing or inconsistent.
    pub fn prepare_with_probe(options: BenchOptions, probe: &dyn CapabilityProbe) -> Result<Self> {
        if options.engines.is_empty() {
            return Err(ConfigError::NoEngines.into());
        }
        if options.runtimes.is_empty() {
            return Err(ConfigError::NoRuntimes.into());
        }
        if options.modes.is_empty() {
            return Err(ConfigError::NoModes.into());
        }
        if options.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout.into());
        }

        let root = std::path::absolute(&options.root).unwrap_or_else(|_| options.root.clone());
        if !root.is_dir() {
            return Err(ConfigError::RootNotFound(root).into());
        }
        let workloads = options.workload_filter().apply(load_corpus(&root)?);
        if workloads.is_empty() {
            return Err(ConfigError::NoWorkloads(root).into());
        }

        let Resolved {
            variants,
            skipped_engines,
            warnings,
        } = resolve_variants(&options, probe)?;
        if variants.is_empty() {
            return Err(ConfigError::NoVariants.into());
        }

        let mut keys = BTreeSet::new();
        for variant in &variants {
            let key = variant.key();
            if !keys.insert(key.clone()) {
                return Err(ConfigError::DuplicateVariant(key).into());
            }
        }

        let (variants, pruned_variants) = if options.preflight {
            preflight(variants, &root, &workloads[0].rel, options.timeout)
        } else {
            (variants, Vec::new())
        };
        if variants.is_empty() {
            return Err(ConfigError::NoVariants.into());
        }

        let baseline = select_baseline(options.baseline.as_deref(), &variants)?;
        crate::metrics::record_plan(workloads.len(), variants.len(), pruned_variants.len());
        info!(
            root = %root.display(),
            workloads = workloads.len(),
            variants = variants.len(),
            %baseline,
            "benchmark prepared"
        );

        Ok(Self {
            cache: PrecompileCache::new(&root),
            options,
            root,
            workloads,
            variants,
            baseline,
            skipped_engines,
            pruned_variants,
            warnings,
            extractor: Box::new(TimeLineExtractor),
        })
    }

    /// Replace the metric extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn MetricExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &BenchOptions {
        &self.options
    }

    /// Absolute corpus root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    #[must_use]
    pub fn variants(&self) -> &[EngineVariant] {
        &self.variants
    }

    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Engines that contributed no variants.
    #[must_use]
    pub fn skipped_engines(&self) -> &[Engine] {
        &self.skipped_engines
    }

    /// Variant keys dropped by preflight.
    #[must_use]
    pub fn pruned_variants(&self) -> &[String] {
        &self.pruned_variants
    }

    /// Findings worth showing to the operator (e.g. limited CLI dialects).
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of runs [`Self::run`] performs.
    #[must_use]
    pub fn total_runs(&self) -> usize {
        self.workloads.len() * self.variants.len()
    }

    /// Execute one workload under one variant.
    #[must_use]
    pub fn run_one(&self, variant: &EngineVariant, workload: &Workload) -> RunResult {
        let policy = self.options.metric;
        let timeout = self.options.timeout;
        let extractor = self.extractor.as_ref();

        if uses_precompile(variant) {
            return match self.cache.run(variant, &self.root, &workload.rel, timeout) {
                Ok(run) => RunResult::from_outcome(variant, workload, policy, &run.out, extractor)
                    .with_cache(run.cache_hit, run.compile_ms),
                Err(err) => {
                    warn!(variant = %variant.key(), rel = %workload.rel, error = %err, "precompiled run failed to start");
                    RunResult::spawn_failure(variant, workload, policy, &err, extractor)
                        .with_cache(false, None)
                }
            };
        }

        let argv = build_command(variant, &workload.rel);
        match run_with_timeout(&argv, &self.root, timeout) {
            Ok(out) => RunResult::from_outcome(variant, workload, policy, &out, extractor),
            Err(err) => {
                warn!(variant = %variant.key(), rel = %workload.rel, error = %err, "engine failed to start");
                RunResult::spawn_failure(variant, workload, policy, &err, extractor)
            }
        }
    }

    /// Execute the full matrix, workload-major, calling `on_event` after each run.
    pub fn run(&self, mut on_event: impl FnMut(&RunEvent<'_>)) -> Vec<RunResult> {
        let total = self.total_runs();
        let mut results = Vec::with_capacity(total);
        for workload in &self.workloads {
            for variant in &self.variants {
                let result = self.run_one(variant, workload);
                debug!(
                    variant = %variant.key(),
                    rel = %workload.rel,
                    rc = result.rc,
                    wall_ms = result.wall_ms,
                    metric_ms = ?result.metric_ms,
                    "run finished"
                );
                crate::metrics::record_run(&result);
                on_event(&RunEvent {
                    index: results.len() + 1,
                    total,
                    workload,
                    variant,
                    result: &result,
                });
                results.push(result);
            }
        }
        results
    }
}

/// Variants contributed by every selected engine.
struct Resolved {
    variants: Vec<EngineVariant>,
    skipped_engines: Vec<Engine>,
    warnings: Vec<String>,
}

fn resolve_variants(options: &BenchOptions, probe: &dyn CapabilityProbe) -> Result<Resolved> {
    let mut variants = Vec::new();
    let mut skipped_engines = Vec::new();
    let mut warnings = Vec::new();
    for &engine in &options.engines {
        let (specs, env_value) = options.bin_specs(engine);
        let mut bins = resolve_bins(engine, specs, env_value)?;
        let mut engine_variants = Vec::new();
        for bin in &mut bins {
            if engine.has_cli_dialects() {
                let dialect = probe.probe(&bin.path);
                if dialect == CliDialect::Minimal {
                    let label = bin.label.as_ref().map_or_else(String::new, |l| format!(" ({l})"));
                    let msg = format!(
                        "{engine}{label}: minimal CLI detected; guest argv support is limited \
                         and argv-dependent workloads may be invalid"
                    );
                    warn!("{msg}");
                    warnings.push(msg);
                }
                bin.dialect = Some(dialect);
            }
            info!(%engine, label = ?bin.label, path = %bin.path.display(), "engine binary");
            engine_variants.extend(supported_variants(
                engine,
                bin,
                &options.runtimes,
                &options.modes,
            ));
        }
        if engine_variants.is_empty() {
            info!(%engine, "no supported variants for the requested runtimes and modes");
            skipped_engines.push(engine);
        }
        variants.extend(engine_variants);
    }
    Ok(Resolved {
        variants,
        skipped_engines,
        warnings,
    })
}

/// Pick the baseline key: the requested one, else the preferred default if
/// present, else the first variant.
///
/// # Errors
/// Returns an error if the requested baseline is not among `variants`.
pub fn select_baseline(
    requested: Option<&str>,
    variants: &[EngineVariant],
) -> std::result::Result<String, ConfigError> {
    let keys: Vec<String> = variants.iter().map(EngineVariant::key).collect();
    match requested {
        Some(baseline) if keys.iter().any(|k| k == baseline) => Ok(baseline.to_string()),
        Some(baseline) => Err(ConfigError::UnknownBaseline {
            baseline: baseline.to_string(),
            available: keys.join(", "),
        }),
        None if keys.iter().any(|k| k == PREFERRED_BASELINE) => Ok(PREFERRED_BASELINE.to_string()),
        None => keys.into_iter().next().ok_or(ConfigError::NoVariants),
    }
}

#[cfg(test)]
mod tests {
    use wbench_engine::{Mode, Runtime};

    use super::*;
    use crate::error::Error;

    fn variant(engine: Engine, runtime: Runtime) -> EngineVariant {
        EngineVariant {
            engine,
            runtime,
            mode: Mode::Full,
            bin: PathBuf::from("/bin/engine"),
            label: None,
            cli: None,
        }
    }

    struct FixedProbe(CliDialect);

    impl CapabilityProbe for FixedProbe {
        fn probe(&self, _bin: &Path) -> CliDialect {
            self.0
        }
    }

    #[test]
    fn test_select_baseline() {
        let vs = vec![
            variant(Engine::Wasmer, Runtime::Jit),
            variant(Engine::Wasm3, Runtime::Int),
        ];
        assert_eq!(select_baseline(None, &vs).unwrap(), "wasm3:int:full");
        assert_eq!(
            select_baseline(Some("wasmer:jit:full"), &vs).unwrap(),
            "wasmer:jit:full"
        );
        assert!(matches!(
            select_baseline(Some("wavm:jit:full"), &vs),
            Err(ConfigError::UnknownBaseline { .. })
        ));
        assert_eq!(
            select_baseline(None, &vs[..1]).unwrap(),
            "wasmer:jit:full"
        );
    }

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("micro")).unwrap();
        std::fs::write(dir.path().join("micro/local_dense_i32.wasm"), b"\0asm").unwrap();
        std::fs::write(dir.path().join("engine"), b"").unwrap();
        dir
    }

    fn config_error(result: Result<Harness>) -> ConfigError {
        match result {
            Err(Error::Config(err)) => err,
            Err(other) => panic!("expected config error, got {other}"),
            Ok(_) => panic!("expected config error"),
        }
    }

    #[test]
    fn test_validation_order() {
        let dir = corpus();
        let probe = FixedProbe(CliDialect::Full);
        let bin = dir.path().join("engine").display().to_string();

        let opts = BenchOptions::new().with_root(dir.path());
        assert!(matches!(
            config_error(Harness::prepare_with_probe(opts.clone(), &probe)),
            ConfigError::NoEngines
        ));

        let opts = opts.with_engine(Engine::Wasm3).with_bin(Engine::Wasm3, bin);
        assert!(matches!(
            config_error(Harness::prepare_with_probe(opts.clone(), &probe)),
            ConfigError::NoRuntimes
        ));

        let opts = opts.with_runtime(Runtime::Jit);
        assert!(matches!(
            config_error(Harness::prepare_with_probe(opts.clone(), &probe)),
            ConfigError::NoModes
        ));

        let opts = opts.with_mode(Mode::Full);
        assert!(matches!(
            config_error(Harness::prepare_with_probe(
                opts.clone().with_root(dir.path().join("missing")),
                &probe
            )),
            ConfigError::RootNotFound(_)
        ));
        assert!(matches!(
            config_error(Harness::prepare_with_probe(
                opts.clone().with_tags(["crypto"]),
                &probe
            )),
            ConfigError::NoWorkloads(_)
        ));
        assert!(matches!(
            config_error(Harness::prepare_with_probe(opts.clone(), &probe)),
            ConfigError::NoVariants
        ));

        let opts = opts.with_runtime(Runtime::Int);
        assert!(matches!(
            config_error(Harness::prepare_with_probe(
                opts.clone().with_baseline("wasm3:int:lazy"),
                &probe
            )),
            ConfigError::UnknownBaseline { .. }
        ));

        let harness = Harness::prepare_with_probe(opts, &probe).unwrap();
        assert_eq!(harness.baseline(), "wasm3:int:full");
        assert_eq!(harness.workloads().len(), 1);
        assert_eq!(harness.total_runs(), 1);
    }

    #[test]
    fn test_missing_binary_is_config_error() {
        let dir = corpus();
        let opts = BenchOptions::new()
            .with_root(dir.path())
            .with_engine(Engine::Wasmer)
            .with_bin(Engine::Wasmer, dir.path().join("nope").display().to_string())
            .with_runtime(Runtime::Jit)
            .with_mode(Mode::Full);
        let err = Harness::prepare_with_probe(opts, &FixedProbe(CliDialect::Full))
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_skipped_engines_and_dialect() {
        let dir = corpus();
        let bin = dir.path().join("engine").display().to_string();
        let opts = BenchOptions::new()
            .with_root(dir.path())
            .with_engines([Engine::Wamr, Engine::Wavm])
            .with_bin(Engine::Wamr, bin.clone())
            .with_bin(Engine::Wavm, bin)
            .with_runtime(Runtime::Int)
            .with_mode(Mode::Full);
        let harness = Harness::prepare_with_probe(opts, &FixedProbe(CliDialect::Minimal)).unwrap();
        assert_eq!(harness.skipped_engines(), &[Engine::Wavm]);
        assert_eq!(harness.variants().len(), 1);
        assert_eq!(harness.variants()[0].cli, Some(CliDialect::Minimal));
        assert_eq!(harness.warnings().len(), 1);
    }
}
