//! Probes run against engine binaries before measuring.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use wbench_engine::{
    CapabilityProbe, CliDialect, EngineVariant, HELP_FLAG, build_command, classify_help_text,
};

use crate::process::{CmdOut, run_with_timeout};

/// Timeout for asking a binary for its usage text.
pub const HELP_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on the preflight run timeout.
pub const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dialect probe that classifies the binary's `-h` output.
#[derive(Debug, Clone)]
pub struct HelpTextProbe {
    cwd: PathBuf,
    timeout: Duration,
}

impl HelpTextProbe {
    #[must_use]
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            timeout: HELP_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CapabilityProbe for HelpTextProbe {
    fn probe(&self, bin: &Path) -> CliDialect {
        let argv = [bin.as_os_str().to_os_string(), OsString::from(HELP_FLAG)];
        match run_with_timeout(&argv, &self.cwd, self.timeout) {
            Ok(out) => {
                let dialect = classify_help_text(out.combined_output().trim());
                debug!(bin = %bin.display(), %dialect, "dialect probed");
                dialect
            }
            Err(err) => {
                warn!(bin = %bin.display(), error = %err, "dialect probe failed, assuming minimal CLI");
                CliDialect::Minimal
            }
        }
    }
}

/// Whether `out` shows the engine rejecting the variant's configuration.
#[must_use]
pub fn reports_unsupported(variant: &EngineVariant, out: &CmdOut) -> bool {
    let markers = variant.engine.unsupported_markers();
    if out.ok() || markers.is_empty() {
        return false;
    }
    let text = out.combined_output().to_lowercase();
    markers.iter().any(|marker| text.contains(marker))
}

/// Run each markable variant once on `probe_rel` and drop those the engine
/// rejects. Returns the kept variants and the pruned keys.
#[must_use]
pub fn preflight(
    variants: Vec<EngineVariant>,
    root: &Path,
    probe_rel: &str,
    timeout: Duration,
) -> (Vec<EngineVariant>, Vec<String>) {
    let timeout = timeout.min(PREFLIGHT_TIMEOUT);
    let mut kept = Vec::with_capacity(variants.len());
    let mut pruned = Vec::new();
    for variant in variants {
        if variant.engine.unsupported_markers().is_empty() {
            kept.push(variant);
            continue;
        }
        let argv = build_command(&variant, probe_rel);
        let unsupported = match run_with_timeout(&argv, root, timeout) {
            Ok(out) => reports_unsupported(&variant, &out),
            Err(err) => {
                warn!(variant = %variant.key(), error = %err, "preflight could not start engine");
                false
            }
        };
        if unsupported {
            info!(variant = %variant.key(), "pruned: engine reports configuration unsupported");
            pruned.push(variant.key());
        } else {
            kept.push(variant);
        }
    }
    (kept, pruned)
}
