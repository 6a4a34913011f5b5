//! Result artifact: run metadata plus every per-run record, as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;
use wbench_corpus::WorkloadKind;
use wbench_engine::{Engine, EngineVariant};

use crate::error::{Error, Result};
use crate::harness::Harness;
use crate::metric::MetricPolicy;
use crate::result::RunResult;

#[derive(Debug, Serialize)]
pub struct WorkloadMeta {
    pub kind: WorkloadKind,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VariantMeta<'a> {
    pub key: String,
    #[serde(flatten)]
    pub variant: &'a EngineVariant,
}

/// Everything needed to interpret `results` without the invocation at hand.
#[derive(Debug, Serialize)]
pub struct Meta<'a> {
    pub root: String,
    pub timeout_s: f64,
    pub count_workloads: usize,
    pub workload_meta: BTreeMap<&'a str, WorkloadMeta>,
    pub kind_semantics: BTreeMap<&'static str, &'static str>,
    pub variants: Vec<VariantMeta<'a>>,
    pub baseline: &'a str,
    pub metric: MetricPolicy,
    pub metric_semantics: &'static str,
    /// Seconds since the Unix epoch.
    pub date_epoch: i64,
    pub argv: Vec<String>,
    pub skipped_engines: &'a [Engine],
    pub pruned_variants: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ResultArtifact<'a> {
    pub meta: Meta<'a>,
    pub results: &'a [RunResult],
}

impl<'a> ResultArtifact<'a> {
    /// Describe a finished run of `harness`.
    #[must_use]
    pub fn new(harness: &'a Harness, results: &'a [RunResult], argv: Vec<String>) -> Self {
        let metric = harness.options().metric;
        let workload_meta = harness
            .workloads()
            .iter()
            .map(|w| {
                let meta = WorkloadMeta {
                    kind: w.kind(),
                    tags: w.classification.tags.iter().cloned().collect(),
                };
                (w.rel.as_str(), meta)
            })
            .collect();
        let kind_semantics = WorkloadKind::ALL
            .iter()
            .map(|k| (k.as_str(), k.description()))
            .collect();
        let variants = harness
            .variants()
            .iter()
            .map(|variant| VariantMeta {
                key: variant.key(),
                variant,
            })
            .collect();

        Self {
            meta: Meta {
                root: harness.root().display().to_string(),
                timeout_s: harness.options().timeout.as_secs_f64(),
                count_workloads: harness.workloads().len(),
                workload_meta,
                kind_semantics,
                variants,
                baseline: harness.baseline(),
                metric,
                metric_semantics: metric.semantics(),
                date_epoch: chrono::Utc::now().timestamp(),
                argv,
                skipped_engines: harness.skipped_engines(),
                pruned_variants: harness.pruned_variants(),
            },
            results,
        }
    }
}

/// Write `artifact` as pretty JSON, creating parent directories.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn write_artifact(path: &Path, artifact: &ResultArtifact<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Artifact {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut json = serde_json::to_string_pretty(artifact)?;
    json.push('\n');
    fs::write(path, json).map_err(|source| Error::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), results = artifact.results.len(), "result artifact written");
    Ok(())
}
