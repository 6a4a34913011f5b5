//! Run command.

use std::path::Path;
use std::time::Duration;

use tracing::info;
use wbench::{
    Harness, KindSummary, ResultArtifact, Summary, summarize, summarize_by_kind, write_artifact,
};

use super::{fail, fmt_stat};
use crate::cli::{EXIT_SUCCESS, MetricArg, SelectArgs};
use crate::terminal::{self, Alignment, Progress, Table};

/// Handle the `run` command.
pub fn cmd_run(
    select: &SelectArgs,
    timeout_s: f64,
    metric: MetricArg,
    baseline: Option<&str>,
    out: &Path,
    show_progress: bool,
) -> i32 {
    // Non-positive or non-finite timeouts are rejected by `Harness::prepare`.
    let timeout = Duration::try_from_secs_f64(timeout_s).unwrap_or(Duration::ZERO);
    let mut opts = select
        .to_options()
        .with_timeout(timeout)
        .with_metric(metric.into())
        .with_out(out);
    if let Some(baseline) = baseline {
        opts = opts.with_baseline(baseline);
    }

    let harness = match Harness::prepare(opts) {
        Ok(h) => h,
        Err(e) => return fail(&e),
    };
    for warning in harness.warnings() {
        terminal::warning(warning);
    }
    for key in harness.pruned_variants() {
        terminal::dim(&format!("pruned {key} (engine reports it unsupported)"));
    }
    terminal::info(&format!(
        "{} workloads x {} variants, baseline {}",
        harness.workloads().len(),
        harness.variants().len(),
        harness.baseline()
    ));

    let total = u64::try_from(harness.total_runs()).unwrap_or(u64::MAX);
    let progress = Progress::new(total, "Running", show_progress);
    let results = harness.run(|event| {
        progress.set_message(format!("{} {}", event.variant.key(), event.workload.rel));
        progress.inc(1);
    });
    progress.finish();

    let argv: Vec<String> = std::env::args().collect();
    let artifact = ResultArtifact::new(&harness, &results, argv);
    let out = &harness.options().out;
    if let Err(e) = write_artifact(out, &artifact) {
        return fail(&e);
    }
    let failed = results.iter().filter(|r| !r.ok).count();
    info!(runs = results.len(), failed, "run complete");
    terminal::success(&format!("{} runs ({failed} failed)", results.len()));
    terminal::path_output(out);

    let metric = harness.options().metric;
    print_summary(&summarize(&results, harness.baseline(), metric));
    for kind in summarize_by_kind(&results, harness.baseline(), metric) {
        print_kind_summary(&kind);
    }

    EXIT_SUCCESS
}

fn print_summary(summary: &Summary) {
    terminal::header(&format!("Summary (metric: {})", summary.metric));
    stats_table(summary).print();
    terminal::header(&format!(
        "Ratio vs {} (lower is faster)",
        summary.baseline
    ));
    ratio_table(summary).print();
}

fn print_kind_summary(kind: &KindSummary) {
    terminal::header(&format!(
        "Kind: {} ({} workloads)",
        kind.kind, kind.workloads
    ));
    stats_table(&kind.summary).print();
    let ratios = ratio_table(&kind.summary);
    if !ratios.is_empty() {
        println!();
        ratios.print();
    }
}

fn stats_table(summary: &Summary) -> Table {
    let mut table = Table::new(vec!["config", "ok", "metric ok", "geomean ms", "median ms"])
        .with_alignments(vec![
            Alignment::Left,
            Alignment::Right,
            Alignment::Right,
            Alignment::Right,
            Alignment::Right,
        ]);
    for (key, stats) in &summary.stats {
        table.add_row(vec![
            key.clone(),
            format!("{}/{}", stats.ok_rc, stats.total),
            format!("{}/{}", stats.ok_metric, stats.total),
            fmt_stat(stats.ms_geomean, 2),
            fmt_stat(stats.ms_median, 2),
        ]);
    }
    table
}

fn ratio_table(summary: &Summary) -> Table {
    let mut table = Table::new(vec!["config", "common ok", "geomean ratio", "median ratio"])
        .with_alignments(vec![
            Alignment::Left,
            Alignment::Right,
            Alignment::Right,
            Alignment::Right,
        ]);
    for (key, ratio) in &summary.ratios {
        table.add_row(vec![
            key.clone(),
            ratio.common_ok.to_string(),
            fmt_stat(ratio.ratio_geomean, 3),
            fmt_stat(ratio.ratio_median, 3),
        ]);
    }
    table
}
