use std::path::PathBuf;

use thiserror::Error;
use wbench_corpus::CorpusError;
use wbench_engine::EngineError;

/// Problems detected before any measurement runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no engines selected")]
    NoEngines,
    #[error("no runtimes selected")]
    NoRuntimes,
    #[error("no modes selected")]
    NoModes,
    #[error("timeout must be positive")]
    InvalidTimeout,
    #[error("root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("no .wasm workloads found under {0} (after filters)")]
    NoWorkloads(PathBuf),
    #[error("no variants selected (check engines, runtimes and modes)")]
    NoVariants,
    #[error("duplicate variant key: {0}")]
    DuplicateVariant(String),
    #[error("baseline {baseline} is not among the resolved variants: {available}")]
    UnknownBaseline { baseline: String, available: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// Harness errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error was raised before measuring started.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Self::Config(err.into())
    }
}

impl From<CorpusError> for Error {
    fn from(err: CorpusError) -> Self {
        Self::Config(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
