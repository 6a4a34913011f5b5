//! WBench - wasm engine benchmark harness
//!
//! Runs every workload of a `.wasm` corpus under every selected engine
//! variant, one process at a time, and compares the timings against a
//! baseline variant.
//!
//! # Example
//!
//! ```ignore
//! use wbench::{BenchOptions, Engine, Harness, Mode, Runtime, summarize};
//!
//! let opts = BenchOptions::new()
//!     .with_engines([Engine::Wasm3, Engine::Wasmer])
//!     .with_runtime(Runtime::Int)
//!     .with_runtime(Runtime::Jit)
//!     .with_mode(Mode::Full);
//! let harness = Harness::prepare(opts)?;
//! let results = harness.run(|_| {});
//! let summary = summarize(&results, harness.baseline(), harness.options().metric);
//! ```

pub use wbench_corpus::{
    Classification, CorpusError, Workload, WorkloadFilter, WorkloadKind, classify, load_corpus,
};
pub use wbench_engine::{
    CapabilityProbe, CliDialect, Engine, EngineError, EngineVariant, Mode, ResolvedBin, Runtime,
    variant_key,
};

mod cache;
mod error;
mod harness;
pub mod metrics;
mod metric;
mod options;
mod probe;
mod process;
mod report;
mod result;
mod summary;

pub use cache::*;
pub use error::*;
pub use harness::*;
pub use metric::*;
pub use options::*;
pub use probe::*;
pub use process::*;
pub use report::*;
pub use result::*;
pub use summary::*;
