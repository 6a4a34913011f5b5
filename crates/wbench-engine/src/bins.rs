//! Engine binary resolution.
//!
//! Binaries come from explicit `[label=]path` specs, then the engine's
//! `WBENCH_<ENGINE>_BIN` variable, then the default command on `PATH`.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{MAIN_SEPARATOR, PathBuf};

use tracing::debug;

use crate::{CliDialect, Engine, EngineError, Result};

/// Separator between entries in a `WBENCH_<ENGINE>_BIN` value.
pub const ENV_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// One `[label=]path` binary spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinEntry {
    pub label: Option<String>,
    pub path: String,
}

impl BinEntry {
    /// Parse a `[label=]path` spec.
    ///
    /// # Errors
    /// Returns an error for an empty spec, an empty label or path, or a
    /// label containing `:` or `#`.
    pub fn parse(engine: Engine, spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(EngineError::EmptyBinSpec(engine));
        }
        let Some((label, path)) = spec.split_once('=') else {
            return Ok(Self {
                label: None,
                path: spec.to_string(),
            });
        };
        let (label, path) = (label.trim(), path.trim());
        if label.is_empty() || path.is_empty() {
            return Err(EngineError::InvalidBinSpec {
                engine,
                spec: spec.to_string(),
            });
        }
        if label.contains([':', '#']) {
            return Err(EngineError::InvalidLabel {
                engine,
                label: label.to_string(),
            });
        }
        Ok(Self {
            label: Some(label.to_string()),
            path: path.to_string(),
        })
    }
}

/// Give every entry a distinct label.
///
/// The first unlabeled entry stays unlabeled; later unlabeled entries at
/// position `i` get `i+1`, or `auto{i+1}` if taken, then `_2`, `_3`, ...
///
/// # Errors
/// Returns an error if two entries carry the same explicit label.
pub fn uniquify_labels(engine: Engine, entries: Vec<BinEntry>) -> Result<Vec<BinEntry>> {
    let mut seen = BTreeSet::new();
    for label in entries.iter().filter_map(|e| e.label.as_deref()) {
        if !seen.insert(label.to_string()) {
            return Err(EngineError::DuplicateLabel {
                engine,
                label: label.to_string(),
            });
        }
    }
    if entries.len() <= 1 {
        return Ok(entries);
    }

    let mut unlabeled_kept = false;
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        if entry.label.is_some() {
            out.push(entry);
            continue;
        }
        if !unlabeled_kept {
            unlabeled_kept = true;
            out.push(entry);
            continue;
        }
        let mut base = (idx + 1).to_string();
        if seen.contains(&base) {
            base = format!("auto{}", idx + 1);
        }
        let mut label = base.clone();
        let mut n = 2;
        while seen.contains(&label) {
            label = format!("{base}_{n}");
            n += 1;
        }
        seen.insert(label.clone());
        out.push(BinEntry {
            label: Some(label),
            path: entry.path,
        });
    }
    Ok(out)
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', MAIN_SEPARATOR]) => rest,
        _ => return PathBuf::from(path),
    };
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(path),
        |home| PathBuf::from(home).join(rest.trim_start_matches(['/', MAIN_SEPARATOR])),
    )
}

/// Find an executable named `name` in the directories of `paths`.
#[must_use]
pub fn find_in(paths: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .map(|dir| dir.join(name))
        .find(|full_path| full_path.is_file())
}

/// Find an executable in `PATH`.
#[must_use]
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| find_in(&paths, name))
}

/// Resolve a configured binary to an existing file.
///
/// Anything containing a separator or starting with `.` is treated as a
/// path and must exist; a bare name is looked up on `PATH` first.
///
/// # Errors
/// Returns an error if the binary cannot be found.
pub fn resolve_executable(engine: Engine, path: &str) -> Result<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyBinSpec(engine));
    }
    let expanded = expand_home(trimmed);
    let as_str = expanded.to_string_lossy();
    let looks_like_path = as_str.contains(['/', MAIN_SEPARATOR]) || as_str.starts_with('.');

    let found = if looks_like_path {
        expanded.exists().then(|| expanded.clone())
    } else {
        find_in_path(&as_str).or_else(|| expanded.exists().then(|| expanded.clone()))
    };
    match found {
        Some(found) => Ok(absolute(found)),
        None if looks_like_path => Err(EngineError::BinaryNotFound {
            engine,
            path: as_str.into_owned(),
        }),
        None => Err(EngineError::BinaryNotInPath {
            engine,
            name: as_str.into_owned(),
        }),
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

/// A resolved engine binary, ready to become variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBin {
    pub label: Option<String>,
    pub path: PathBuf,
    /// Filled in by the dialect probe for engines that need one.
    pub dialect: Option<CliDialect>,
}

/// Split an environment value into `[label=]path` specs.
#[must_use]
pub fn split_env_specs(value: &str) -> Vec<String> {
    value
        .split(ENV_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve the binaries for `engine`.
///
/// `specs` are explicit command-line entries; `env_value` is the content of
/// the engine's environment variable, if set. With neither, the default
/// command is looked up on `PATH`.
///
/// # Errors
/// Returns an error if a spec is malformed, a binary is missing, or
/// nothing at all resolves.
pub fn resolve_bins(
    engine: Engine,
    specs: &[String],
    env_value: Option<&str>,
) -> Result<Vec<ResolvedBin>> {
    let env_specs = env_value.map(split_env_specs).unwrap_or_default();
    let (source, specs) = match (specs.is_empty(), env_specs.is_empty()) {
        (false, _) => ("cli", specs),
        (true, false) => ("env", env_specs.as_slice()),
        (true, true) => {
            let Some(path) = find_in_path(engine.default_command()) else {
                return Err(EngineError::NoBinary {
                    engine,
                    env_var: engine.env_var(),
                    command: engine.default_command(),
                });
            };
            debug!(%engine, path = %path.display(), "resolved default command");
            return Ok(vec![ResolvedBin {
                label: None,
                path: absolute(path),
                dialect: None,
            }]);
        }
    };

    let entries = specs
        .iter()
        .map(|spec| BinEntry::parse(engine, spec))
        .collect::<Result<Vec<_>>>()?;
    uniquify_labels(engine, entries)?
        .into_iter()
        .map(|entry| {
            let path = resolve_executable(engine, &entry.path)?;
            debug!(%engine, source, label = ?entry.label, path = %path.display(), "resolved binary");
            Ok(ResolvedBin {
                label: entry.label,
                path,
                dialect: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn entry(label: Option<&str>, path: &str) -> BinEntry {
        BinEntry {
            label: label.map(String::from),
            path: path.to_string(),
        }
    }

    fn labels(entries: &[BinEntry]) -> Vec<Option<&str>> {
        entries.iter().map(|e| e.label.as_deref()).collect()
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            BinEntry::parse(Engine::Wasm3, " /opt/wasm3 ").unwrap(),
            entry(None, "/opt/wasm3")
        );
        assert_eq!(
            BinEntry::parse(Engine::Wasm3, "new = /opt/wasm3").unwrap(),
            entry(Some("new"), "/opt/wasm3")
        );
        assert!(matches!(
            BinEntry::parse(Engine::Wasm3, "  "),
            Err(EngineError::EmptyBinSpec(_))
        ));
        assert!(matches!(
            BinEntry::parse(Engine::Wasm3, "=/opt/wasm3"),
            Err(EngineError::InvalidBinSpec { .. })
        ));
        assert!(matches!(
            BinEntry::parse(Engine::Wasm3, "a=  "),
            Err(EngineError::InvalidBinSpec { .. })
        ));
        assert!(matches!(
            BinEntry::parse(Engine::Wasm3, "a#b=/x"),
            Err(EngineError::InvalidLabel { .. })
        ));
        assert!(matches!(
            BinEntry::parse(Engine::Wasm3, "a:b=/x"),
            Err(EngineError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_uniquify_single_entry_untouched() {
        let out = uniquify_labels(Engine::Wamr, vec![entry(None, "a")]).unwrap();
        assert_eq!(labels(&out), vec![None]);
    }

    #[test]
    fn test_uniquify_auto_labels() {
        let out = uniquify_labels(
            Engine::Wamr,
            vec![entry(None, "a"), entry(None, "b"), entry(None, "c")],
        )
        .unwrap();
        assert_eq!(labels(&out), vec![None, Some("2"), Some("3")]);
    }

    #[test]
    fn test_uniquify_avoids_taken_labels() {
        let out = uniquify_labels(
            Engine::Wamr,
            vec![
                entry(Some("2"), "a"),
                entry(None, "b"),
                entry(None, "c"),
                entry(Some("auto3"), "d"),
            ],
        )
        .unwrap();
        assert_eq!(
            labels(&out),
            vec![Some("2"), None, Some("3"), Some("auto3")]
        );

        let out = uniquify_labels(
            Engine::Wamr,
            vec![
                entry(None, "a"),
                entry(None, "b"),
                entry(Some("2"), "c"),
                entry(Some("auto2"), "d"),
            ],
        )
        .unwrap();
        assert_eq!(
            labels(&out),
            vec![None, Some("auto2_2"), Some("2"), Some("auto2")]
        );
    }

    #[test]
    fn test_uniquify_rejects_duplicates() {
        let err = uniquify_labels(
            Engine::Wasmtime,
            vec![entry(Some("x"), "a"), entry(Some("x"), "b")],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateLabel { .. }));
    }

    #[test]
    fn test_resolve_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("wasm3");
        std::fs::write(&bin, b"").unwrap();
        let spec = format!("fast={}", bin.display());

        let bins = resolve_bins(Engine::Wasm3, &[spec], None).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label.as_deref(), Some("fast"));
        assert_eq!(bins[0].path, bin);

        let missing = dir.path().join("missing").display().to_string();
        assert!(matches!(
            resolve_bins(Engine::Wasm3, &[missing], None),
            Err(EngineError::BinaryNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_from_env_value() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();
        let value = format!("{}{ENV_LIST_SEPARATOR}old={}", a.display(), b.display());

        let bins = resolve_bins(Engine::Uwvm2, &[], Some(&value)).unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].label, None);
        assert_eq!(bins[1].label.as_deref(), Some("old"));
    }

    #[test]
    fn test_cli_specs_win_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"").unwrap();
        let bins = resolve_bins(
            Engine::Wavm,
            &[a.display().to_string()],
            Some("/definitely/not/here"),
        )
        .unwrap();
        assert_eq!(bins[0].path, a);
    }

    #[test]
    fn test_find_in() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("iwasm"), b"").unwrap();
        let paths = std::env::join_paths([Path::new("/nonexistent"), dir.path()]).unwrap();
        assert_eq!(find_in(&paths, "iwasm"), Some(dir.path().join("iwasm")));
        assert_eq!(find_in(&paths, "wavm"), None);
    }
}
