//! Precompiled artifact cache for engines with a separate compile step.
//!
//! Artifacts live under `<root>/cache/wbench/<engine>/<key>.cwasm`, keyed by
//! the identity of both the engine binary and the workload file. An entry is
//! only ever created by renaming a finished compile output into place.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use wbench_engine::{EngineVariant, precompile_commands};

use crate::process::{CmdOut, run_with_timeout};

/// Cache location relative to the corpus root.
pub const CACHE_SUBDIR: &str = "cache/wbench";

/// Extension of compiled artifacts.
pub const ARTIFACT_EXT: &str = "cwasm";

/// Hex characters of the digest kept in a cache key.
pub const KEY_LEN: usize = 20;

fn mtime_ns(meta: &std::fs::Metadata) -> io::Result<u128> {
    Ok(meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos())
}

/// Cache key for running `rel` (relative to `root`) under the binary `bin`.
///
/// Covers the canonical binary path, its size and mtime, the workload path
/// and the workload size and mtime.
///
/// # Errors
/// Returns an error if either file cannot be inspected.
pub fn cache_key(bin: &Path, root: &Path, rel: &str) -> io::Result<String> {
    let bin = std::fs::canonicalize(bin)?;
    let bin_meta = std::fs::metadata(&bin)?;
    let wl_meta = std::fs::metadata(root.join(rel))?;
    let identity = format!(
        "{}|{}|{}|{}|{}|{}",
        bin.display(),
        bin_meta.len(),
        mtime_ns(&bin_meta)?,
        rel,
        wl_meta.len(),
        mtime_ns(&wl_meta)?,
    );
    let mut key = hex::encode(Sha256::digest(identity.as_bytes()));
    key.truncate(KEY_LEN);
    Ok(key)
}

/// Outcome of a compile-then-run execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecompiledOut {
    /// Run outcome, or the compile outcome if compilation failed.
    pub out: CmdOut,
    pub cache_hit: bool,
    /// Compile wall time on a cache miss.
    pub compile_ms: Option<f64>,
    pub artifact: PathBuf,
}

/// Artifact cache rooted under a corpus directory.
#[derive(Debug, Clone)]
pub struct PrecompileCache {
    dir: PathBuf,
}

impl PrecompileCache {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(CACHE_SUBDIR),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for `key` under the variant's engine directory.
    #[must_use]
    pub fn artifact_path(&self, variant: &EngineVariant, key: &str) -> PathBuf {
        self.dir
            .join(variant.engine.as_str())
            .join(format!("{key}.{ARTIFACT_EXT}"))
    }

    /// Run `rel` under `variant`, compiling into the cache first on a miss.
    ///
    /// Reported wall time on a miss is compile plus run time. If compilation
    /// fails the compile outcome is returned and nothing is cached.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be written or a process cannot
    /// be spawned.
    pub fn run(
        &self,
        variant: &EngineVariant,
        root: &Path,
        rel: &str,
        timeout: Duration,
    ) -> io::Result<PrecompiledOut> {
        let key = cache_key(&variant.bin, root, rel)?;
        let artifact = self.artifact_path(variant, &key);
        let engine_dir = artifact.parent().unwrap_or(&self.dir);
        std::fs::create_dir_all(engine_dir)?;

        if artifact.is_file() {
            debug!(variant = %variant.key(), rel, key = %key, "cache hit");
            let cmds = commands(variant, rel, &artifact, &artifact)?;
            let out = run_with_timeout(&cmds.run, root, timeout)?;
            return Ok(PrecompiledOut {
                out,
                cache_hit: true,
                compile_ms: None,
                artifact,
            });
        }

        debug!(variant = %variant.key(), rel, key = %key, "cache miss, compiling");
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".tmp")
            .tempfile_in(engine_dir)?;
        let cmds = commands(variant, rel, staging.path(), &artifact)?;
        let compiled = run_with_timeout(&cmds.compile, root, timeout)?;
        if !compiled.ok() {
            warn!(variant = %variant.key(), rel, rc = compiled.rc, "precompile failed");
            return Ok(PrecompiledOut {
                compile_ms: Some(compiled.wall_ms),
                out: compiled,
                cache_hit: false,
                artifact,
            });
        }
        staging.persist(&artifact).map_err(|e| e.error)?;

        let ran = run_with_timeout(&cmds.run, root, timeout)?;
        let stderr = format!("{}\n{}\n{}", compiled.stdout, compiled.stderr, ran.stderr)
            .trim_matches('\n')
            .to_string();
        Ok(PrecompiledOut {
            out: CmdOut {
                rc: ran.rc,
                wall_ms: compiled.wall_ms + ran.wall_ms,
                stdout: ran.stdout,
                stderr,
            },
            cache_hit: false,
            compile_ms: Some(compiled.wall_ms),
            artifact,
        })
    }
}

fn commands(
    variant: &EngineVariant,
    rel: &str,
    staging: &Path,
    artifact: &Path,
) -> io::Result<wbench_engine::PrecompileCommands> {
    precompile_commands(variant, rel, staging, artifact).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} has no compile step", variant.key()),
        )
    })
}
