//! Aggregation of run results into per-configuration statistics.
//!
//! Ratios against the baseline are computed per workload, over only the
//! workloads both configurations measured, so a configuration that fails
//! part of the corpus is not averaged over its easy half.

use std::collections::BTreeMap;

use serde::Serialize;
use wbench_corpus::WorkloadKind;

use crate::metric::{MetricPolicy, is_usable};
use crate::result::RunResult;

/// Geometric mean of the usable values; NaN if there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn geomean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|&&v| is_usable(v))
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v.ln(), count + 1));
    if count == 0 {
        return f64::NAN;
    }
    (sum / count as f64).exp()
}

/// Median of the usable values; NaN if there are none.
///
/// An even count yields the mean of the two middle values.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    let mut vals: Vec<f64> = values.iter().copied().filter(|&v| is_usable(v)).collect();
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.sort_by(f64::total_cmp);
    let mid = vals.len() / 2;
    if vals.len() % 2 == 0 {
        f64::midpoint(vals[mid - 1], vals[mid])
    } else {
        vals[mid]
    }
}

/// Per-configuration statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigStats {
    /// Runs that exited successfully.
    pub ok_rc: usize,
    /// Successful runs with a usable metric.
    pub ok_metric: usize,
    pub total: usize,
    pub ms_geomean: f64,
    pub ms_median: f64,
}

/// Ratio of a configuration to the baseline over their common workloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioStats {
    /// Workloads both measured.
    pub common_ok: usize,
    pub ratio_geomean: f64,
    pub ratio_median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub metric: MetricPolicy,
    pub baseline: String,
    pub stats: BTreeMap<String, ConfigStats>,
    /// Every configuration except the baseline.
    pub ratios: BTreeMap<String, RatioStats>,
}

impl Summary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

fn usable_by_workload<'a>(
    results: &[&'a RunResult],
    policy: MetricPolicy,
) -> BTreeMap<&'a str, f64> {
    results
        .iter()
        .filter_map(|&r| Some((r.wasm.as_str(), r.usable_metric(policy)?)))
        .collect()
}

/// Summarize `results` against the `baseline` configuration key.
#[must_use]
pub fn summarize(results: &[RunResult], baseline: &str, policy: MetricPolicy) -> Summary {
    let mut by_key: BTreeMap<String, Vec<&RunResult>> = BTreeMap::new();
    for r in results {
        by_key.entry(r.key()).or_default().push(r);
    }

    let stats = by_key
        .iter()
        .map(|(key, rs)| {
            let vals: Vec<f64> = rs.iter().filter_map(|r| r.usable_metric(policy)).collect();
            let stats = ConfigStats {
                ok_rc: rs.iter().filter(|r| r.ok).count(),
                ok_metric: vals.len(),
                total: rs.len(),
                ms_geomean: geomean(&vals),
                ms_median: median(&vals),
            };
            (key.clone(), stats)
        })
        .collect();

    let base_vals = by_key
        .get(baseline)
        .map(|rs| usable_by_workload(rs, policy))
        .unwrap_or_default();
    let ratios = by_key
        .iter()
        .filter(|(key, _)| key.as_str() != baseline)
        .map(|(key, rs)| {
            let cur_vals = usable_by_workload(rs, policy);
            let pairs: Vec<f64> = base_vals
                .iter()
                .filter_map(|(wasm, base)| Some(cur_vals.get(wasm)? / base))
                .collect();
            let ratio = RatioStats {
                common_ok: pairs.len(),
                ratio_geomean: geomean(&pairs),
                ratio_median: median(&pairs),
            };
            (key.clone(), ratio)
        })
        .collect();

    Summary {
        metric: policy,
        baseline: baseline.to_string(),
        stats,
        ratios,
    }
}

/// Summary restricted to the workloads of one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindSummary {
    pub kind: WorkloadKind,
    /// Distinct workloads of this kind.
    pub workloads: usize,
    #[serde(flatten)]
    pub summary: Summary,
}

/// Repeat [`summarize`] for every kind present, in kind order.
#[must_use]
pub fn summarize_by_kind(
    results: &[RunResult],
    baseline: &str,
    policy: MetricPolicy,
) -> Vec<KindSummary> {
    let mut by_kind: BTreeMap<WorkloadKind, Vec<RunResult>> = BTreeMap::new();
    for r in results {
        by_kind.entry(r.bench_kind).or_default().push(r.clone());
    }
    by_kind
        .into_iter()
        .map(|(kind, rs)| {
            let mut workloads: Vec<&str> = rs.iter().map(|r| r.wasm.as_str()).collect();
            workloads.sort_unstable();
            workloads.dedup();
            KindSummary {
                kind,
                workloads: workloads.len(),
                summary: summarize(&rs, baseline, policy),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use wbench_engine::{Engine, Mode, Runtime};

    use super::*;
    use crate::metric::MetricKind;

    fn run(engine: Engine, runtime: Runtime, wasm: &str, ok: bool, ms: f64) -> RunResult {
        let kind = if wasm.starts_with("wasi/") {
            WorkloadKind::IoDense
        } else {
            WorkloadKind::ComputeDense
        };
        RunResult {
            engine,
            runtime,
            mode: Mode::Full,
            label: None,
            wasm: wasm.to_string(),
            bench_kind: kind,
            bench_tags: vec![],
            ok,
            rc: i32::from(!ok),
            wall_ms: ms,
            internal_ms: None,
            metric: MetricPolicy::Wall,
            metric_kind: MetricKind::Wall,
            metric_ms: Some(ms),
            cache_hit: None,
            compile_ms: None,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
        }
    }

    const BASE: &str = "wasm3:int:full";
    const CAND: &str = "wasmer:jit:full";

    fn base(wasm: &str, ok: bool, ms: f64) -> RunResult {
        run(Engine::Wasm3, Runtime::Int, wasm, ok, ms)
    }

    fn cand(wasm: &str, ok: bool, ms: f64) -> RunResult {
        run(Engine::Wasmer, Runtime::Jit, wasm, ok, ms)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_geomean_and_median() {
        assert!(close(geomean(&[1.0, 4.0]), 2.0));
        assert!(close(geomean(&[2.0, 0.0, -1.0, f64::NAN, 8.0]), 4.0));
        assert!(geomean(&[]).is_nan());
        assert!(geomean(&[0.0, f64::INFINITY]).is_nan());

        assert!(close(median(&[3.0, 1.0, 2.0]), 2.0));
        assert!(close(median(&[4.0, 1.0, 3.0, 2.0]), 2.5));
        assert!(median(&[]).is_nan());
        assert!(median(&[-1.0]).is_nan());
    }

    #[test]
    fn test_ratio_uses_intersection() {
        let results = vec![
            base("a.wasm", true, 10.0),
            base("b.wasm", true, 10.0),
            base("c.wasm", true, 10.0),
            cand("a.wasm", true, 5.0),
            cand("b.wasm", false, 1.0),
            cand("c.wasm", true, 20.0),
        ];
        let s = summarize(&results, BASE, MetricPolicy::Wall);

        let b = &s.stats[BASE];
        assert_eq!((b.ok_rc, b.ok_metric, b.total), (3, 3, 3));
        assert!(close(b.ms_geomean, 10.0));

        let c = &s.stats[CAND];
        assert_eq!((c.ok_rc, c.ok_metric, c.total), (2, 2, 3));

        assert!(!s.ratios.contains_key(BASE));
        let r = &s.ratios[CAND];
        assert_eq!(r.common_ok, 2);
        assert!(close(r.ratio_geomean, 1.0));
        assert!(close(r.ratio_median, 1.25));
    }

    #[test]
    fn test_no_common_workloads() {
        let results = vec![base("a.wasm", true, 10.0), cand("b.wasm", true, 5.0)];
        let s = summarize(&results, BASE, MetricPolicy::Wall);
        let r = &s.ratios[CAND];
        assert_eq!(r.common_ok, 0);
        assert!(r.ratio_geomean.is_nan());
        assert!(r.ratio_median.is_nan());
    }

    #[test]
    fn test_ok_but_unmeasured() {
        let mut r = base("a.wasm", true, 10.0);
        r.metric = MetricPolicy::Internal;
        let s = summarize(&[r], BASE, MetricPolicy::Internal);
        let b = &s.stats[BASE];
        assert_eq!((b.ok_rc, b.ok_metric), (1, 0));
        assert!(b.ms_geomean.is_nan());
    }

    #[test]
    fn test_by_kind() {
        let results = vec![
            base("wasi/io.wasm", true, 10.0),
            cand("wasi/io.wasm", true, 5.0),
            base("arith_add.wasm", true, 10.0),
            cand("arith_add.wasm", true, 30.0),
        ];
        let kinds = summarize_by_kind(&results, BASE, MetricPolicy::Wall);
        let order: Vec<_> = kinds.iter().map(|k| k.kind).collect();
        assert_eq!(order, vec![WorkloadKind::ComputeDense, WorkloadKind::IoDense]);
        assert_eq!(kinds[0].workloads, 1);
        assert!(close(kinds[0].summary.ratios[CAND].ratio_geomean, 3.0));
        assert!(close(kinds[1].summary.ratios[CAND].ratio_geomean, 0.5));
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let s = summarize(&[], BASE, MetricPolicy::Auto);
        assert!(s.is_empty());
        let stats = ConfigStats {
            ok_rc: 0,
            ok_metric: 0,
            total: 1,
            ms_geomean: f64::NAN,
            ms_median: f64::NAN,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["ms_geomean"], serde_json::Value::Null);
    }
}
