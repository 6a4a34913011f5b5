//! Precompiled artifact reuse for compile-step engines.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::{FixedProbe, corpus, fake_engine, spec};
use wbench::{BenchOptions, CliDialect, Engine, Harness, Mode, Runtime};

const WORKLOAD: &str = "wasi/file_rw_8m.wasm";

/// Logs each compile next to itself, writes the `-o` target and reports a
/// self-measured time when running.
const FAKE_WASMTIME: &str = r#"log="$(dirname "$0")/compile.log"
case "$1" in
  compile)
    echo "compile $2" >> "$log"
    out=""
    while [ $# -gt 0 ]; do
      if [ "$1" = "-o" ]; then out="$2"; fi
      shift
    done
    printf 'native code' > "$out"
    echo "compiled"
    ;;
  run)
    [ "$2" = --allow-precompiled ] || exit 8
    echo "Elapsed time: 12.5 ms"
    ;;
  *) exit 7 ;;
esac"#;

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    bin: PathBuf,
}

impl Fixture {
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        corpus(&root, &[WORKLOAD]);
        let bin = fake_engine(&dir.path().join("bin"), "wasmtime", body);
        Self {
            _dir: dir,
            root,
            bin,
        }
    }

    fn harness(&self) -> Harness {
        let opts = BenchOptions::new()
            .with_root(&self.root)
            .with_engine(Engine::Wasmtime)
            .with_bin(Engine::Wasmtime, spec(&self.bin))
            .with_runtime(Runtime::Jit)
            .with_mode(Mode::Full)
            .with_timeout(Duration::from_secs(10));
        Harness::prepare_with_probe(opts, &FixedProbe(CliDialect::Full)).unwrap()
    }

    fn compiles(&self) -> usize {
        let log = self.bin.with_file_name("compile.log");
        fs::read_to_string(log).map_or(0, |s| s.lines().count())
    }

    fn cache_dir(&self) -> PathBuf {
        self.root.join("cache/wbench/wasmtime")
    }
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| rd.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    found.sort();
    found
}

#[test]
fn test_second_run_reuses_artifact() {
    let fx = Fixture::new(FAKE_WASMTIME);

    let first = fx.harness().run(|_| {});
    let r = &first[0];
    assert!(r.ok, "rc {} stderr {}", r.rc, r.stderr_tail);
    assert_eq!(r.cache_hit, Some(false));
    let compile_ms = r.compile_ms.unwrap();
    assert!(r.wall_ms >= compile_ms);
    assert_eq!(r.internal_ms, Some(12.5));
    assert_eq!(r.stderr_tail, "compiled");
    assert_eq!(fx.compiles(), 1);

    let artifacts = entries(&fx.cache_dir());
    assert_eq!(artifacts.len(), 1, "{artifacts:?}");
    let artifact = &artifacts[0];
    assert_eq!(artifact.extension().unwrap(), "cwasm");
    assert_eq!(fs::read_to_string(artifact).unwrap(), "native code");
    let mtime = fs::metadata(artifact).unwrap().modified().unwrap();

    std::thread::sleep(Duration::from_millis(20));
    let second = fx.harness().run(|_| {});
    let r = &second[0];
    assert!(r.ok);
    assert_eq!(r.cache_hit, Some(true));
    assert_eq!(r.compile_ms, None);
    assert_eq!(fx.compiles(), 1);
    assert_eq!(fs::metadata(artifact).unwrap().modified().unwrap(), mtime);
    assert_eq!(entries(&fx.cache_dir()), artifacts);
}

#[test]
fn test_changed_workload_recompiles() {
    let fx = Fixture::new(FAKE_WASMTIME);
    fx.harness().run(|_| {});
    assert_eq!(fx.compiles(), 1);

    fs::write(fx.root.join(WORKLOAD), b"\0asm\x01\0\0\0 different size").unwrap();
    let results = fx.harness().run(|_| {});
    assert_eq!(results[0].cache_hit, Some(false));
    assert_eq!(fx.compiles(), 2);
    assert_eq!(entries(&fx.cache_dir()).len(), 2);
}

#[test]
fn test_failed_compile_is_the_result_and_caches_nothing() {
    let body = r#"case "$1" in
  compile) echo "error: invalid module" >&2; exit 1 ;;
  run) echo "should not run"; exit 0 ;;
esac"#;
    let fx = Fixture::new(body);
    let results = fx.harness().run(|_| {});

    let r = &results[0];
    assert!(!r.ok);
    assert_eq!(r.rc, 1);
    assert_eq!(r.cache_hit, Some(false));
    assert_eq!(r.stderr_tail, "error: invalid module");
    assert!(!r.stdout_tail.contains("should not run"));
    assert!(entries(&fx.cache_dir()).is_empty());
}
