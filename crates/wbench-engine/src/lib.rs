//! Engine model for wasm engine benchmarks.
//!
//! Describes which (engine, runtime, mode) combinations each engine can
//! realize, resolves engine binaries, and maps a variant plus a workload
//! path to the engine's command line.

mod bins;
mod command;
mod probe;
mod variant;

pub use bins::*;
pub use command::*;
pub use probe::*;
pub use variant::*;

use thiserror::Error;

/// Engine configuration errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown engine: {0}")]
    UnknownEngine(String),
    #[error("empty binary spec for {0}")]
    EmptyBinSpec(Engine),
    #[error("invalid binary spec for {engine} (expected label=path): {spec:?}")]
    InvalidBinSpec { engine: Engine, spec: String },
    #[error("invalid label for {engine} (must not contain ':' or '#'): {label:?}")]
    InvalidLabel { engine: Engine, label: String },
    #[error("duplicate label for {engine}: {label:?}")]
    DuplicateLabel { engine: Engine, label: String },
    #[error("{engine} binary not found: {path}")]
    BinaryNotFound { engine: Engine, path: String },
    #[error("{engine} binary not found in PATH: {name}")]
    BinaryNotInPath { engine: Engine, name: String },
    #[error("{engine} not found: pass --{engine}-bin, set {env_var}, or install {command} in PATH")]
    NoBinary {
        engine: Engine,
        env_var: String,
        command: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
