//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use wbench::{
    BenchOptions, DEFAULT_OUT, DEFAULT_ROOT, Engine, MetricPolicy, Mode, Runtime, WorkloadKind,
};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration errors (nothing was measured).
pub const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "wbench")]
#[command(about = "Wasm engine benchmark harness - runs a workload corpus across engines")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the corpus across engine variants and compare against a baseline
    Run {
        #[command(flatten)]
        select: SelectArgs,

        /// Per-run timeout in seconds
        #[arg(long, default_value = "25")]
        timeout: f64,

        /// Timing signal to aggregate
        #[arg(long, value_enum, default_value = "auto")]
        metric: MetricArg,

        /// Baseline variant key (default: wasm3:int:full if available, else the first variant)
        #[arg(long, value_name = "KEY")]
        baseline: Option<String>,

        /// Result artifact path
        #[arg(short, long, default_value = DEFAULT_OUT)]
        out: PathBuf,
    },
    /// Print each workload with its classification (nothing is executed)
    Classify {
        /// Corpus root directory
        #[arg(long, default_value = DEFAULT_ROOT)]
        root: PathBuf,

        /// Only list workloads of these kinds
        #[arg(long = "kind", value_enum)]
        kinds: Vec<KindArg>,

        /// Only list workloads carrying any of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Resolve binaries and list the variants a run would measure
    Variants {
        #[command(flatten)]
        select: SelectArgs,
    },
}

/// Engine, binary and workload selection shared by `run` and `variants`.
#[derive(Args, Clone, Debug)]
pub struct SelectArgs {
    /// Engines to benchmark (repeatable)
    #[arg(short, long = "engine", value_enum)]
    pub engines: Vec<EngineArg>,

    /// Runtimes to request (repeatable)
    #[arg(long = "runtime", value_enum)]
    pub runtimes: Vec<RuntimeArg>,

    /// Modes to request (repeatable)
    #[arg(long = "mode", value_enum)]
    pub modes: Vec<ModeArg>,

    /// Corpus root directory
    #[arg(long, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Maximum number of workloads (0 = all)
    #[arg(long, default_value = "0")]
    pub max_workloads: usize,

    /// Only run workloads of these kinds (repeatable)
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<KindArg>,

    /// Only run workloads carrying any of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Skip probing engines that can reject configurations at runtime
    #[arg(long)]
    pub no_preflight: bool,

    #[command(flatten)]
    pub bins: BinArgs,
}

/// Engine binaries as `[label=]path`. Each flag is repeatable; several
/// binaries of one engine become separate labeled variants. Falls back to
/// `WBENCH_<ENGINE>_BIN`, then the engine's command name in `PATH`.
#[derive(Args, Clone, Debug, Default)]
pub struct BinArgs {
    /// wasm3 binary
    #[arg(long = "wasm3-bin", value_name = "[LABEL=]PATH")]
    pub wasm3: Vec<String>,

    /// uwvm2 binary
    #[arg(long = "uwvm2-bin", value_name = "[LABEL=]PATH")]
    pub uwvm2: Vec<String>,

    /// WAMR iwasm binary
    #[arg(long = "wamr-bin", value_name = "[LABEL=]PATH")]
    pub wamr: Vec<String>,

    /// wasmtime binary
    #[arg(long = "wasmtime-bin", value_name = "[LABEL=]PATH")]
    pub wasmtime: Vec<String>,

    /// wasmer binary
    #[arg(long = "wasmer-bin", value_name = "[LABEL=]PATH")]
    pub wasmer: Vec<String>,

    /// wasmedge binary
    #[arg(long = "wasmedge-bin", value_name = "[LABEL=]PATH")]
    pub wasmedge: Vec<String>,

    /// wavm binary
    #[arg(long = "wavm-bin", value_name = "[LABEL=]PATH")]
    pub wavm: Vec<String>,
}

impl BinArgs {
    /// Explicit specs for `engine`.
    #[must_use]
    pub fn specs(&self, engine: Engine) -> &[String] {
        match engine {
            Engine::Wasm3 => &self.wasm3,
            Engine::Uwvm2 => &self.uwvm2,
            Engine::Wamr => &self.wamr,
            Engine::Wasmtime => &self.wasmtime,
            Engine::Wasmer => &self.wasmer,
            Engine::Wasmedge => &self.wasmedge,
            Engine::Wavm => &self.wavm,
        }
    }
}

impl SelectArgs {
    /// Options for this selection, with environment binary fallbacks.
    #[must_use]
    pub fn to_options(&self) -> BenchOptions {
        let mut opts = BenchOptions::new()
            .with_engines(self.engines.iter().copied().map(Engine::from))
            .with_root(&self.root)
            .with_max_workloads(self.max_workloads)
            .with_kinds(self.kinds.iter().copied().map(WorkloadKind::from))
            .with_tags(&self.tags)
            .with_preflight(!self.no_preflight)
            .with_process_env();
        for &runtime in &self.runtimes {
            opts = opts.with_runtime(runtime.into());
        }
        for &mode in &self.modes {
            opts = opts.with_mode(mode.into());
        }
        for &engine in Engine::ALL {
            for spec in self.bins.specs(engine) {
                opts = opts.with_bin(engine, spec.clone());
            }
        }
        opts
    }
}

/// Engine argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EngineArg {
    Wasm3,
    Uwvm2,
    Wamr,
    Wasmtime,
    Wasmer,
    Wasmedge,
    Wavm,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Wasm3 => Self::Wasm3,
            EngineArg::Uwvm2 => Self::Uwvm2,
            EngineArg::Wamr => Self::Wamr,
            EngineArg::Wasmtime => Self::Wasmtime,
            EngineArg::Wasmer => Self::Wasmer,
            EngineArg::Wasmedge => Self::Wasmedge,
            EngineArg::Wavm => Self::Wavm,
        }
    }
}

/// Execution strategy argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RuntimeArg {
    /// Interpreter
    Int,
    /// JIT compiler
    Jit,
    /// Tiered interpreter/JIT
    Tiered,
}

impl From<RuntimeArg> for Runtime {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Int => Self::Int,
            RuntimeArg::Jit => Self::Jit,
            RuntimeArg::Tiered => Self::Tiered,
        }
    }
}

/// Compilation timing argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Translate everything before execution
    Full,
    /// Translate on first use
    Lazy,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Full => Self::Full,
            ModeArg::Lazy => Self::Lazy,
        }
    }
}

/// Metric policy argument.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum MetricArg {
    /// Orchestrator wall-clock time
    Wall,
    /// Self-reported time only (absent stays absent)
    Internal,
    /// Self-reported time when present, else wall-clock
    #[default]
    Auto,
}

impl From<MetricArg> for MetricPolicy {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Wall => Self::Wall,
            MetricArg::Internal => Self::Internal,
            MetricArg::Auto => Self::Auto,
        }
    }
}

/// Workload kind argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    ComputeDense,
    MemoryDense,
    IoDense,
    SyscallDense,
    LocalDense,
    OperandStackDense,
    CallDense,
    ControlFlowDense,
    Unknown,
}

impl From<KindArg> for WorkloadKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::ComputeDense => Self::ComputeDense,
            KindArg::MemoryDense => Self::MemoryDense,
            KindArg::IoDense => Self::IoDense,
            KindArg::SyscallDense => Self::SyscallDense,
            KindArg::LocalDense => Self::LocalDense,
            KindArg::OperandStackDense => Self::OperandStackDense,
            KindArg::CallDense => Self::CallDense,
            KindArg::ControlFlowDense => Self::ControlFlowDense,
            KindArg::Unknown => Self::Unknown,
        }
    }
}
