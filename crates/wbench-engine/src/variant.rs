//! Engines, runtimes, modes and the per-engine compatibility matrix.

use std::path::PathBuf;

use serde::Serialize;

use crate::{CliDialect, EngineError, ResolvedBin};

/// External wasm engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Wasm3,
    Uwvm2,
    Wamr,
    Wasmtime,
    Wasmer,
    Wasmedge,
    Wavm,
}

impl Engine {
    /// All supported engines.
    pub const ALL: &'static [Self] = &[
        Self::Wasm3,
        Self::Uwvm2,
        Self::Wamr,
        Self::Wasmtime,
        Self::Wasmer,
        Self::Wasmedge,
        Self::Wavm,
    ];

    /// Parse from string (e.g., "wasmtime").
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Get string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wasm3 => "wasm3",
            Self::Uwvm2 => "uwvm2",
            Self::Wamr => "wamr",
            Self::Wasmtime => "wasmtime",
            Self::Wasmer => "wasmer",
            Self::Wasmedge => "wasmedge",
            Self::Wavm => "wavm",
        }
    }

    /// Runtimes this engine can be told to use.
    #[must_use]
    pub const fn supported_runtimes(self) -> &'static [Runtime] {
        match self {
            Self::Wasm3 | Self::Uwvm2 | Self::Wamr => &[Runtime::Int],
            Self::Wasmtime | Self::Wasmer | Self::Wavm => &[Runtime::Jit],
            Self::Wasmedge => &[Runtime::Int, Runtime::Jit],
        }
    }

    /// Compilation modes this engine can be told to use.
    #[must_use]
    pub const fn supported_modes(self) -> &'static [Mode] {
        match self {
            Self::Wasm3 | Self::Wasmtime => &[Mode::Full, Mode::Lazy],
            Self::Uwvm2 | Self::Wamr | Self::Wasmer | Self::Wasmedge | Self::Wavm => &[Mode::Full],
        }
    }

    /// Executable name looked up on `PATH` when no binary is configured.
    #[must_use]
    pub const fn default_command(self) -> &'static str {
        match self {
            Self::Wasm3 => "wasm3",
            Self::Uwvm2 => "uwvm",
            Self::Wamr => "iwasm",
            Self::Wasmtime => "wasmtime",
            Self::Wasmer => "wasmer",
            Self::Wasmedge => "wasmedge",
            Self::Wavm => "wavm",
        }
    }

    /// Environment variable holding binary specs for this engine.
    #[must_use]
    pub fn env_var(self) -> String {
        format!("WBENCH_{}_BIN", self.as_str().to_uppercase())
    }

    /// Output fragments (lower-case) by which the engine rejects a configuration.
    ///
    /// Engines with no markers are never preflight-probed.
    #[must_use]
    pub const fn unsupported_markers(self) -> &'static [&'static str] {
        match self {
            Self::Uwvm2 => &["not currently supported"],
            _ => &[],
        }
    }

    /// Whether the engine's CLI surface differs across builds.
    #[must_use]
    pub const fn has_cli_dialects(self) -> bool {
        matches!(self, Self::Wamr)
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Engine {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| EngineError::UnknownEngine(s.to_string()))
    }
}

/// Execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Int,
    Jit,
    Tiered,
}

impl Runtime {
    pub const ALL: &'static [Self] = &[Self::Int, Self::Jit, Self::Tiered];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Jit => "jit",
            Self::Tiered => "tiered",
        }
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ahead-of-time (`full`) or on-demand (`lazy`) compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Full,
    Lazy,
}

impl Mode {
    pub const ALL: &'static [Self] = &[Self::Full, Self::Lazy];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Lazy => "lazy",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration identity: `engine[#label]:runtime:mode`.
#[must_use]
pub fn variant_key(engine: Engine, runtime: Runtime, mode: Mode, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => format!("{engine}#{label}:{runtime}:{mode}"),
        _ => format!("{engine}:{runtime}:{mode}"),
    }
}

/// One runnable (engine, runtime, mode, binary) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineVariant {
    pub engine: Engine,
    pub runtime: Runtime,
    pub mode: Mode,
    /// Resolved engine executable.
    pub bin: PathBuf,
    /// Distinguishes several binaries of the same engine.
    pub label: Option<String>,
    /// CLI dialect, for engines whose flags differ across builds.
    pub cli: Option<CliDialect>,
}

impl EngineVariant {
    #[must_use]
    pub fn key(&self) -> String {
        variant_key(self.engine, self.runtime, self.mode, self.label.as_deref())
    }
}

/// Cross product of the requested runtimes and modes, restricted to what
/// `engine` supports. Unsupported requests contribute nothing.
#[must_use]
pub fn supported_variants(
    engine: Engine,
    bin: &ResolvedBin,
    runtimes: &[Runtime],
    modes: &[Mode],
) -> Vec<EngineVariant> {
    let mut variants = Vec::new();
    for (i, &runtime) in runtimes.iter().enumerate() {
        if !engine.supported_runtimes().contains(&runtime) || runtimes[..i].contains(&runtime) {
            continue;
        }
        for (j, &mode) in modes.iter().enumerate() {
            if !engine.supported_modes().contains(&mode) || modes[..j].contains(&mode) {
                continue;
            }
            variants.push(EngineVariant {
                engine,
                runtime,
                mode,
                bin: bin.path.clone(),
                label: bin.label.clone(),
                cli: bin.dialect,
            });
        }
    }
    variants
}
