//! Path-convention workload classifier.

use std::collections::BTreeSet;

use serde::Serialize;

/// Primary performance characteristic of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
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

impl WorkloadKind {
    /// All kinds, in reporting order.
    pub const ALL: &'static [Self] = &[
        Self::ComputeDense,
        Self::MemoryDense,
        Self::IoDense,
        Self::SyscallDense,
        Self::LocalDense,
        Self::OperandStackDense,
        Self::CallDense,
        Self::ControlFlowDense,
        Self::Unknown,
    ];

    /// Parse from the snake_case name (e.g., "io_dense").
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Get string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComputeDense => "compute_dense",
            Self::MemoryDense => "memory_dense",
            Self::IoDense => "io_dense",
            Self::SyscallDense => "syscall_dense",
            Self::LocalDense => "local_dense",
            Self::OperandStackDense => "operand_stack_dense",
            Self::CallDense => "call_dense",
            Self::ControlFlowDense => "control_flow_dense",
            Self::Unknown => "unknown",
        }
    }

    /// One-line meaning of the kind, recorded in result artifacts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ComputeDense => "dense arithmetic/crypto/science compute",
            Self::MemoryDense => "memory bandwidth / data-structure heavy",
            Self::IoDense => "WASI filesystem I/O heavy",
            Self::SyscallDense => "WASI syscall overhead heavy",
            Self::LocalDense => "local.get/local.set heavy",
            Self::OperandStackDense => "deep operand-stack manipulation heavy",
            Self::CallDense => "function call overhead heavy",
            Self::ControlFlowDense => "branch/jump/switch heavy",
            Self::Unknown => "uncategorized",
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary kind plus tags. The kind is always present in `tags` as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: WorkloadKind,
    pub tags: BTreeSet<String>,
}

impl Classification {
    /// Check whether the workload carries a tag (kinds are tags too).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Tag accumulator used while walking the rule tables.
struct Tags(BTreeSet<String>);

impl Tags {
    fn add(&mut self, tag: &str) {
        self.0.insert(tag.to_string());
    }

    fn add_kind(&mut self, kind: WorkloadKind) {
        self.add(kind.as_str());
    }
}

fn contains_any(name: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| name.contains(n))
}

fn starts_with_any(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p))
}

/// Classify a workload from its path relative to the corpus root.
///
/// Recognized top-level directories (`wasi/`, `micro/`, `crypto/`,
/// `science/`, `db/`, `vm/`) each get a category tag and their own
/// name rules. Everything else goes through the flat legacy naming rules
/// and falls back to [`WorkloadKind::Unknown`].
#[must_use]
pub fn classify(rel: &str) -> Classification {
    let rel = rel.replace('\\', "/").to_lowercase();
    let name = rel.rsplit('/').next().unwrap_or(rel.as_str());

    let mut tags = Tags(BTreeSet::new());

    // Numeric flavor, orthogonal to the primary kind.
    if contains_any(name, &["f32", "f64"]) {
        tags.add("float_dense");
    }
    if contains_any(name, &["i8", "u8", "i16", "u16", "i32", "i64", "u32", "u64"]) {
        tags.add("int_dense");
    }

    let kind = if rel.starts_with("wasi/") {
        classify_wasi(name, &mut tags)
    } else if rel.starts_with("micro/") {
        classify_micro(name, &mut tags)
    } else if rel.starts_with("crypto/") {
        tags.add("crypto");
        tags.add("int_dense");
        WorkloadKind::ComputeDense
    } else if rel.starts_with("science/") {
        classify_science(name, &mut tags)
    } else if rel.starts_with("db/") {
        tags.add("db");
        tags.add("int_dense");
        tags.add("memory_dense");
        tags.add("control_flow_dense");
        WorkloadKind::MemoryDense
    } else if rel.starts_with("vm/") {
        tags.add("vm");
        tags.add("int_dense");
        tags.add("control_flow_dense");
        tags.add("call_dense");
        WorkloadKind::ControlFlowDense
    } else {
        classify_legacy(name, &mut tags)
    };

    tags.add_kind(kind);
    Classification { kind, tags: tags.0 }
}

fn classify_wasi(name: &str, tags: &mut Tags) -> WorkloadKind {
    tags.add("wasi");
    tags.add("syscall_dense");
    if contains_any(
        name,
        &["file_rw", "small_io", "readv", "writev", "pread", "pwrite", "seek_read"],
    ) {
        tags.add("io_dense");
        return WorkloadKind::IoDense;
    }
    WorkloadKind::SyscallDense
}

fn classify_micro(name: &str, tags: &mut Tags) -> WorkloadKind {
    use WorkloadKind::{
        CallDense, ComputeDense, ControlFlowDense, LocalDense, MemoryDense, OperandStackDense,
    };

    tags.add("micro");

    if name.contains("global_dense") {
        tags.add("compute_dense");
        tags.add("global_dense");
        return ComputeDense;
    }
    if name.contains("select_dense") {
        tags.add("compute_dense");
        tags.add("operand_stack_dense");
        return ComputeDense;
    }
    if name.contains("local_dense") {
        tags.add("compute_dense");
        return LocalDense;
    }
    if name.contains("operand_stack_dense") {
        tags.add("compute_dense");
        return OperandStackDense;
    }
    if contains_any(
        name,
        &["call_direct", "call_dense", "call_indirect", "indirect_call"],
    ) {
        tags.add("compute_dense");
        return CallDense;
    }
    if contains_any(name, &["br_table", "br_if", "control_flow_dense", "switch"]) {
        tags.add("compute_dense");
        return ControlFlowDense;
    }
    if contains_any(
        name,
        &["mem_", "pointer_chase", "random_access", "memory_grow", "alloc"],
    ) {
        return MemoryDense;
    }
    if name.contains("rle_") || name.starts_with("rle") {
        tags.add("control_flow_dense");
        return MemoryDense;
    }
    if name.contains("utf8") {
        tags.add("control_flow_dense");
        return ControlFlowDense;
    }
    if contains_any(name, &["json", "quicksort", "qsort", "varint"]) {
        tags.add("control_flow_dense");
        tags.add("memory_dense");
        return ControlFlowDense;
    }
    tags.add("compute_dense");
    ComputeDense
}

fn classify_science(name: &str, tags: &mut Tags) -> WorkloadKind {
    tags.add("science");
    tags.add("compute_dense");
    if name.contains("daxpy") {
        return WorkloadKind::MemoryDense;
    }
    if contains_any(name, &["mandelbrot", "sieve", "gcd"]) {
        return WorkloadKind::ControlFlowDense;
    }
    WorkloadKind::ComputeDense
}

const STACK_PREFIXES: &[&str] = &["deepstack", "inloop_deepstack", "stack_reduce", "keepstack"];
const COMPUTE_PREFIXES: &[&str] = &[
    "arith_",
    "bench_compute_",
    "bitops_",
    "divrem_",
    "local_",
    "global_",
    "inline_step",
    "inline_empty",
    "aabb",
];

/// Rules for the historical flat namespace of few-variable microbenches.
fn classify_legacy(name: &str, tags: &mut Tags) -> WorkloadKind {
    if starts_with_any(name, &["call", "inline", "bench_call"]) || name.contains("call_") {
        return WorkloadKind::CallDense;
    }
    if starts_with_any(name, &["branch", "br_table", "br_", "bench_branchy"])
        || contains_any(name, &["branch", "_br_", "br_ret"])
    {
        return WorkloadKind::ControlFlowDense;
    }
    if name.contains("mem_") || name.starts_with("stack_spill") {
        return WorkloadKind::MemoryDense;
    }
    if starts_with_any(name, &["blake", "sha", "siphash", "chacha"]) {
        tags.add("crypto");
        return WorkloadKind::ComputeDense;
    }

    if starts_with_any(name, STACK_PREFIXES) || starts_with_any(name, COMPUTE_PREFIXES) {
        if name.contains("local_") {
            tags.add("compute_dense");
            return WorkloadKind::LocalDense;
        }
        if starts_with_any(name, STACK_PREFIXES) {
            tags.add("compute_dense");
            return WorkloadKind::OperandStackDense;
        }
        return WorkloadKind::ComputeDense;
    }
    if name == "coremark.wasm" || name == "python.wasm" {
        tags.add("control_flow_dense");
        tags.add("vm");
        return WorkloadKind::ControlFlowDense;
    }
    WorkloadKind::Unknown
}
