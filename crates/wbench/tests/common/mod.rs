//! Shared fixtures: throwaway corpora and shell-script engines.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use wbench::{CapabilityProbe, CliDialect};

/// Create `rels` (with a minimal wasm header) under `root`.
pub fn corpus(root: &Path, rels: &[&str]) {
    for rel in rels {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"\0asm\x01\0\0\0").unwrap();
    }
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Probe answering a fixed dialect without running anything.
pub struct FixedProbe(pub CliDialect);

impl CapabilityProbe for FixedProbe {
    fn probe(&self, _bin: &Path) -> CliDialect {
        self.0
    }
}

/// Path spec accepted by `BenchOptions::with_bin`.
pub fn spec(path: &Path) -> String {
    path.display().to_string()
}
