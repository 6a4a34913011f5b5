use serde::Serialize;
use wbench_corpus::{Workload, WorkloadKind};
use wbench_engine::{Engine, EngineVariant, Mode, Runtime, variant_key};

use crate::metric::{MetricExtractor, MetricKind, MetricPolicy, is_usable};
use crate::process::{CmdOut, SPAWN_FAILURE_RC, TAIL_CHARS, tail};

/// One (workload, variant) execution record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub engine: Engine,
    pub runtime: Runtime,
    pub mode: Mode,
    pub label: Option<String>,
    /// Workload path relative to the corpus root.
    pub wasm: String,
    pub bench_kind: WorkloadKind,
    pub bench_tags: Vec<String>,
    pub ok: bool,
    pub rc: i32,
    pub wall_ms: f64,
    pub internal_ms: Option<f64>,
    /// Requested policy.
    pub metric: MetricPolicy,
    /// Measurement the policy resolved to.
    pub metric_kind: MetricKind,
    pub metric_ms: Option<f64>,
    /// Whether a precompiled artifact was reused (compile-step variants only).
    pub cache_hit: Option<bool>,
    pub compile_ms: Option<f64>,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

impl RunResult {
    /// Build a record from a finished process.
    #[must_use]
    pub fn from_outcome(
        variant: &EngineVariant,
        workload: &Workload,
        policy: MetricPolicy,
        out: &CmdOut,
        extractor: &dyn MetricExtractor,
    ) -> Self {
        let internal_ms = extractor.extract(&out.combined_output());
        let (metric_kind, metric_ms) = policy.resolve(out.wall_ms, internal_ms);
        Self {
            engine: variant.engine,
            runtime: variant.runtime,
            mode: variant.mode,
            label: variant.label.clone(),
            wasm: workload.rel.clone(),
            bench_kind: workload.kind(),
            bench_tags: workload.classification.tags.iter().cloned().collect(),
            ok: out.ok(),
            rc: out.rc,
            wall_ms: out.wall_ms,
            internal_ms,
            metric: policy,
            metric_kind,
            metric_ms,
            cache_hit: None,
            compile_ms: None,
            stdout_tail: tail(&out.stdout, TAIL_CHARS),
            stderr_tail: tail(&out.stderr, TAIL_CHARS),
        }
    }

    /// Build a failed record for a process that could not be started.
    #[must_use]
    pub fn spawn_failure(
        variant: &EngineVariant,
        workload: &Workload,
        policy: MetricPolicy,
        err: &std::io::Error,
        extractor: &dyn MetricExtractor,
    ) -> Self {
        let out = CmdOut {
            rc: SPAWN_FAILURE_RC,
            wall_ms: 0.0,
            stdout: String::new(),
            stderr: err.to_string(),
        };
        Self::from_outcome(variant, workload, policy, &out, extractor)
    }

    /// Attach precompile cache details.
    #[must_use]
    pub const fn with_cache(mut self, cache_hit: bool, compile_ms: Option<f64>) -> Self {
        self.cache_hit = Some(cache_hit);
        self.compile_ms = compile_ms;
        self
    }

    /// Configuration key of the variant that produced this record.
    #[must_use]
    pub fn key(&self) -> String {
        variant_key(self.engine, self.runtime, self.mode, self.label.as_deref())
    }

    /// Value under `policy`, if the run succeeded with a usable measurement.
    #[must_use]
    pub fn usable_metric(&self, policy: MetricPolicy) -> Option<f64> {
        if !self.ok {
            return None;
        }
        policy
            .resolve(self.wall_ms, self.internal_ms)
            .1
            .filter(|&v| is_usable(v))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wbench_corpus::classify;

    use super::*;
    use crate::metric::TimeLineExtractor;

    fn variant() -> EngineVariant {
        EngineVariant {
            engine: Engine::Wasm3,
            runtime: Runtime::Int,
            mode: Mode::Full,
            bin: PathBuf::from("/bin/wasm3"),
            label: Some("new".to_string()),
            cli: None,
        }
    }

    fn workload(rel: &str) -> Workload {
        Workload {
            path: PathBuf::from(rel),
            rel: rel.to_string(),
            classification: classify(rel),
        }
    }

    fn out(rc: i32, wall_ms: f64, stdout: &str) -> CmdOut {
        CmdOut {
            rc,
            wall_ms,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_from_outcome_extracts_internal() {
        let r = RunResult::from_outcome(
            &variant(),
            &workload("micro/local_dense_i32.wasm"),
            MetricPolicy::Auto,
            &out(0, 20.0, "Time: 4 ms\n"),
            &TimeLineExtractor,
        );
        assert!(r.ok);
        assert_eq!(r.key(), "wasm3#new:int:full");
        assert_eq!(r.internal_ms, Some(4.0));
        assert_eq!(r.metric_kind, MetricKind::Internal);
        assert_eq!(r.metric_ms, Some(4.0));
        assert_eq!(r.bench_kind, WorkloadKind::LocalDense);
        assert!(r.bench_tags.iter().any(|t| t == "local_dense"));
        assert_eq!(r.usable_metric(MetricPolicy::Wall), Some(20.0));
    }

    #[test]
    fn test_ok_without_metric() {
        let r = RunResult::from_outcome(
            &variant(),
            &workload("a.wasm"),
            MetricPolicy::Internal,
            &out(0, 20.0, "done"),
            &TimeLineExtractor,
        );
        assert!(r.ok);
        assert_eq!(r.metric_ms, None);
        assert_eq!(r.usable_metric(MetricPolicy::Internal), None);
    }

    #[test]
    fn test_failed_run_has_no_usable_metric() {
        let r = RunResult::from_outcome(
            &variant(),
            &workload("a.wasm"),
            MetricPolicy::Wall,
            &out(1, 20.0, ""),
            &TimeLineExtractor,
        );
        assert!(!r.ok);
        assert_eq!(r.metric_ms, Some(20.0));
        assert_eq!(r.usable_metric(MetricPolicy::Wall), None);
    }

    #[test]
    fn test_spawn_failure() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let r = RunResult::spawn_failure(
            &variant(),
            &workload("a.wasm"),
            MetricPolicy::Auto,
            &err,
            &TimeLineExtractor,
        );
        assert!(!r.ok);
        assert_eq!(r.rc, SPAWN_FAILURE_RC);
        assert_eq!(r.stderr_tail, "no such file");
    }

    #[test]
    fn test_serializes_undefined_as_null() {
        let r = RunResult::from_outcome(
            &variant(),
            &workload("a.wasm"),
            MetricPolicy::Internal,
            &out(0, 1.0, ""),
            &TimeLineExtractor,
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["metric_ms"], serde_json::Value::Null);
        assert_eq!(json["engine"], "wasm3");
        assert_eq!(json["metric"], "internal");
        assert_eq!(json["bench_kind"], "unknown");
    }
}
