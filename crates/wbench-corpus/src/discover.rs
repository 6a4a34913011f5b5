//! Recursive workload discovery and filtering.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::{Classification, CorpusError, Result, WorkloadKind, classify};

/// Directory names never descended into.
pub const SKIP_DIRS: &[&str] = &[".git", "__pycache__", ".venv", "logs", "cache"];

/// Workload file extension.
pub const WORKLOAD_EXT: &str = "wasm";

/// A discovered, classified workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Absolute path to the workload file.
    pub path: PathBuf,
    /// Path relative to the corpus root, `/`-separated.
    pub rel: String,
    pub classification: Classification,
}

impl Workload {
    #[must_use]
    pub const fn kind(&self) -> WorkloadKind {
        self.classification.kind
    }
}

/// Find all workload files under `root`, sorted by path.
///
/// # Errors
/// Returns an error if `root` is not a directory or cannot be read.
pub fn find_workloads(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CorpusError::RootNotFound(root.to_path_buf()));
    }
    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err)?;
        if file_type.is_dir() {
            let skip = entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIP_DIRS.contains(&name));
            if skip {
                debug!(path = %path.display(), "skipping excluded directory");
                continue;
            }
            walk(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == WORKLOAD_EXT) && path.is_file() {
            found.push(path);
        }
    }
    Ok(())
}

/// Express `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are returned unchanged (lossily converted).
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return path.to_string_lossy().into_owned();
    };
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Discover and classify every workload under `root`.
///
/// # Errors
/// Returns an error if the corpus cannot be scanned.
pub fn load_corpus(root: &Path) -> Result<Vec<Workload>> {
    let workloads = find_workloads(root)?
        .into_iter()
        .map(|path| {
            let rel = relative_path(root, &path);
            let classification = classify(&rel);
            Workload {
                path,
                rel,
                classification,
            }
        })
        .collect::<Vec<_>>();
    debug!(root = %root.display(), count = workloads.len(), "corpus loaded");
    Ok(workloads)
}

/// Kind/tag/count filter applied to a classified corpus.
#[derive(Debug, Clone, Default)]
pub struct WorkloadFilter {
    /// Keep only these primary kinds (empty = all).
    pub kinds: BTreeSet<WorkloadKind>,
    /// Keep workloads carrying any of these tags (empty = all).
    pub tags: BTreeSet<String>,
    /// Maximum number of workloads kept (0 = unlimited).
    pub max: usize,
}

impl WorkloadFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = WorkloadKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Restrict to workloads having at least one of the tags.
    ///
    /// Tags are trimmed and lower-cased; blank entries are ignored.
    #[must_use]
    pub fn with_tags<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(
            tags.into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        self
    }

    /// Cap the number of workloads kept (0 = unlimited).
    #[must_use]
    pub const fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Check whether a single workload passes the kind and tag filters.
    #[must_use]
    pub fn matches(&self, classification: &Classification) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&classification.kind) {
            return false;
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&classification.tags) {
            return false;
        }
        true
    }

    /// Apply kind filter, then tag filter, then the cap, preserving order.
    #[must_use]
    pub fn apply(&self, workloads: Vec<Workload>) -> Vec<Workload> {
        let kept = workloads
            .into_iter()
            .filter(|w| self.matches(&w.classification));
        if self.max > 0 {
            kept.take(self.max).collect()
        } else {
            kept.collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"\0asm").unwrap();
    }

    #[test]
    fn test_find_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "micro/b.wasm");
        touch(dir.path(), "a.wasm");
        touch(dir.path(), "cache/wbench/x.wasm");
        touch(dir.path(), "logs/y.wasm");
        touch(dir.path(), ".git/z.wasm");
        touch(dir.path(), "micro/notes.txt");

        let found = find_workloads(dir.path()).unwrap();
        let rels: Vec<_> = found
            .iter()
            .map(|p| relative_path(dir.path(), p))
            .collect();
        assert_eq!(rels, vec!["a.wasm", "micro/b.wasm"]);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            find_workloads(&missing),
            Err(CorpusError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_load_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "wasi/file_rw_8m.wasm");
        touch(dir.path(), "micro/local_dense_i32.wasm");
        touch(dir.path(), "crypto/sha256.wasm");

        let corpus = load_corpus(dir.path()).unwrap();
        assert_eq!(corpus.len(), 3);

        let by_kind = WorkloadFilter::new()
            .with_kinds([WorkloadKind::IoDense])
            .apply(corpus.clone());
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[0].rel, "wasi/file_rw_8m.wasm");

        let by_tag = WorkloadFilter::new()
            .with_tags([" Crypto ", "micro", ""])
            .apply(corpus.clone());
        let rels: Vec<_> = by_tag.iter().map(|w| w.rel.as_str()).collect();
        assert_eq!(rels, vec!["crypto/sha256.wasm", "micro/local_dense_i32.wasm"]);

        let capped = WorkloadFilter::new().with_max(2).apply(corpus);
        assert_eq!(capped.len(), 2);
    }
}
