//! Workload corpus for wasm engine benchmarks.
//!
//! Discovers `.wasm` workloads under a corpus root and classifies each one
//! into a primary [`WorkloadKind`] plus a set of descriptive tags. Classification
//! depends only on the relative path, so it can run before anything executes.

mod classify;
mod discover;

pub use classify::*;
pub use discover::*;

use std::path::PathBuf;

use thiserror::Error;

/// Corpus errors.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("corpus root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CorpusError>;
