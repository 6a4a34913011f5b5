//! Per-engine command lines.
//!
//! Commands run with the corpus root as working directory and take the
//! workload path relative to it; each engine is granted access to `.`.

use std::ffi::OsString;
use std::path::Path;

use crate::{CliDialect, Engine, EngineVariant, Mode, Runtime};

/// Compile-then-run command pair for engines with an ahead-of-time step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompileCommands {
    /// Writes the compiled artifact to the staging path.
    pub compile: Vec<OsString>,
    /// Runs the compiled artifact from its final path.
    pub run: Vec<OsString>,
}

/// Invocation conventions of one engine family.
pub trait CommandStrategy {
    /// Direct command running `workload`.
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString>;

    /// Whether `mode` goes through a separate compile step.
    fn precompiles(&self, _mode: Mode) -> bool {
        false
    }

    /// Compile and run commands, for variants where [`Self::precompiles`] holds.
    fn precompile(
        &self,
        _variant: &EngineVariant,
        _workload: &str,
        _staging: &Path,
        _artifact: &Path,
    ) -> Option<PrecompileCommands> {
        None
    }
}

fn argv<I, S>(bin: &Path, args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    std::iter::once(bin.as_os_str().to_os_string())
        .chain(args.into_iter().map(Into::into))
        .collect()
}

pub struct Wasm3Command;

impl CommandStrategy for Wasm3Command {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        match variant.mode {
            Mode::Full => argv(&variant.bin, ["--compile", workload]),
            Mode::Lazy => argv(&variant.bin, [workload]),
        }
    }
}

pub struct Uwvm2Command;

impl CommandStrategy for Uwvm2Command {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        argv(
            &variant.bin,
            [
                "-Rcc",
                variant.runtime.as_str(),
                "-Rcm",
                variant.mode.as_str(),
                "-I1dir",
                ".",
                ".",
                "--",
                workload,
            ],
        )
    }
}

pub struct WamrCommand;

impl CommandStrategy for WamrCommand {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        match variant.cli.unwrap_or(CliDialect::Minimal) {
            CliDialect::Full => argv(&variant.bin, ["--dir=.", workload]),
            CliDialect::Minimal => argv(&variant.bin, ["-f", workload, "-d", "."]),
        }
    }
}

pub struct WasmtimeCommand;

impl CommandStrategy for WasmtimeCommand {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        argv(&variant.bin, ["run", "--dir", ".", workload])
    }

    fn precompiles(&self, mode: Mode) -> bool {
        mode == Mode::Full
    }

    fn precompile(
        &self,
        variant: &EngineVariant,
        workload: &str,
        staging: &Path,
        artifact: &Path,
    ) -> Option<PrecompileCommands> {
        if !self.precompiles(variant.mode) {
            return None;
        }
        let mut compile = argv(&variant.bin, ["compile", workload, "-o"]);
        compile.push(staging.as_os_str().to_os_string());
        let mut run = argv(&variant.bin, ["run", "--allow-precompiled", "--dir", "."]);
        run.push(artifact.as_os_str().to_os_string());
        Some(PrecompileCommands { compile, run })
    }
}

pub struct WasmerCommand;

impl CommandStrategy for WasmerCommand {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        argv(&variant.bin, ["run", "--dir", ".", workload])
    }
}

pub struct WasmedgeCommand;

impl CommandStrategy for WasmedgeCommand {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        // Mappings are guest:host.
        let runtime_flag = match variant.runtime {
            Runtime::Int => "--force-interpreter",
            Runtime::Jit | Runtime::Tiered => "--enable-jit",
        };
        argv(&variant.bin, [runtime_flag, "--dir", ".:.", workload])
    }
}

pub struct WavmCommand;

impl CommandStrategy for WavmCommand {
    fn command(&self, variant: &EngineVariant, workload: &str) -> Vec<OsString> {
        argv(&variant.bin, ["run", "--mount-root", ".", workload])
    }
}

/// Command strategy for an engine family.
#[must_use]
pub fn strategy(engine: Engine) -> &'static dyn CommandStrategy {
    match engine {
        Engine::Wasm3 => &Wasm3Command,
        Engine::Uwvm2 => &Uwvm2Command,
        Engine::Wamr => &WamrCommand,
        Engine::Wasmtime => &WasmtimeCommand,
        Engine::Wasmer => &WasmerCommand,
        Engine::Wasmedge => &WasmedgeCommand,
        Engine::Wavm => &WavmCommand,
    }
}

/// Build the direct command line running `workload` under `variant`.
#[must_use]
pub fn build_command(variant: &EngineVariant, workload: &str) -> Vec<OsString> {
    strategy(variant.engine).command(variant, workload)
}

/// Whether `variant` runs through a compile step and the artifact cache.
#[must_use]
pub fn uses_precompile(variant: &EngineVariant) -> bool {
    strategy(variant.engine).precompiles(variant.mode)
}

/// Compile and run commands for `variant`, if it precompiles.
#[must_use]
pub fn precompile_commands(
    variant: &EngineVariant,
    workload: &str,
    staging: &Path,
    artifact: &Path,
) -> Option<PrecompileCommands> {
    strategy(variant.engine).precompile(variant, workload, staging, artifact)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn variant(engine: Engine, runtime: Runtime, mode: Mode) -> EngineVariant {
        EngineVariant {
            engine,
            runtime,
            mode,
            bin: PathBuf::from("/bin/engine"),
            label: None,
            cli: None,
        }
    }

    fn strs(args: &[OsString]) -> Vec<&str> {
        args.iter().map(|a| a.to_str().unwrap()).collect()
    }

    #[test]
    fn test_wasm3_modes() {
        let full = build_command(&variant(Engine::Wasm3, Runtime::Int, Mode::Full), "a.wasm");
        assert_eq!(strs(&full), ["/bin/engine", "--compile", "a.wasm"]);
        let lazy = build_command(&variant(Engine::Wasm3, Runtime::Int, Mode::Lazy), "a.wasm");
        assert_eq!(strs(&lazy), ["/bin/engine", "a.wasm"]);
    }

    #[test]
    fn test_uwvm2() {
        let cmd = build_command(
            &variant(Engine::Uwvm2, Runtime::Int, Mode::Full),
            "micro/x.wasm",
        );
        assert_eq!(
            strs(&cmd),
            [
                "/bin/engine",
                "-Rcc",
                "int",
                "-Rcm",
                "full",
                "-I1dir",
                ".",
                ".",
                "--",
                "micro/x.wasm"
            ]
        );
    }

    #[test]
    fn test_wamr_dialects() {
        let mut v = variant(Engine::Wamr, Runtime::Int, Mode::Full);
        assert_eq!(
            strs(&build_command(&v, "a.wasm")),
            ["/bin/engine", "-f", "a.wasm", "-d", "."]
        );
        v.cli = Some(CliDialect::Full);
        assert_eq!(
            strs(&build_command(&v, "a.wasm")),
            ["/bin/engine", "--dir=.", "a.wasm"]
        );
    }

    #[test]
    fn test_wasmedge_runtimes() {
        let jit = build_command(&variant(Engine::Wasmedge, Runtime::Jit, Mode::Full), "a.wasm");
        assert_eq!(strs(&jit), ["/bin/engine", "--enable-jit", "--dir", ".:.", "a.wasm"]);
        let int = build_command(&variant(Engine::Wasmedge, Runtime::Int, Mode::Full), "a.wasm");
        assert_eq!(
            strs(&int),
            ["/bin/engine", "--force-interpreter", "--dir", ".:.", "a.wasm"]
        );
    }

    #[test]
    fn test_run_style_engines() {
        let wasmer = build_command(&variant(Engine::Wasmer, Runtime::Jit, Mode::Full), "a.wasm");
        assert_eq!(strs(&wasmer), ["/bin/engine", "run", "--dir", ".", "a.wasm"]);
        let wavm = build_command(&variant(Engine::Wavm, Runtime::Jit, Mode::Full), "a.wasm");
        assert_eq!(strs(&wavm), ["/bin/engine", "run", "--mount-root", ".", "a.wasm"]);
    }

    #[test]
    fn test_wasmtime_precompile() {
        let lazy = variant(Engine::Wasmtime, Runtime::Jit, Mode::Lazy);
        assert!(!uses_precompile(&lazy));
        assert_eq!(
            strs(&build_command(&lazy, "a.wasm")),
            ["/bin/engine", "run", "--dir", ".", "a.wasm"]
        );
        assert!(
            precompile_commands(&lazy, "a.wasm", Path::new("t"), Path::new("c")).is_none()
        );

        let full = variant(Engine::Wasmtime, Runtime::Jit, Mode::Full);
        assert!(uses_precompile(&full));
        let cmds =
            precompile_commands(&full, "a.wasm", Path::new("/c/tmp"), Path::new("/c/k.cwasm"))
                .unwrap();
        assert_eq!(
            strs(&cmds.compile),
            ["/bin/engine", "compile", "a.wasm", "-o", "/c/tmp"]
        );
        assert_eq!(
            strs(&cmds.run),
            ["/bin/engine", "run", "--allow-precompiled", "--dir", ".", "/c/k.cwasm"]
        );
    }

    #[test]
    fn test_only_wasmtime_precompiles() {
        for &engine in Engine::ALL {
            for &mode in Mode::ALL {
                let v = variant(engine, Runtime::Jit, mode);
                assert_eq!(
                    uses_precompile(&v),
                    engine == Engine::Wasmtime && mode == Mode::Full
                );
            }
        }
    }
}
