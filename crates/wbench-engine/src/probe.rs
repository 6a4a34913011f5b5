//! CLI dialect detection.

use std::path::Path;

use serde::Serialize;

/// Flag used to ask an engine binary for its usage text.
pub const HELP_FLAG: &str = "-h";

/// Command-line surface of an engine build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CliDialect {
    /// Directory mounts and guest arguments are available.
    Full,
    /// Bare `-f FILE` style; guest argv support is limited.
    Minimal,
}

impl CliDialect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Minimal => "minimal",
        }
    }
}

impl std::fmt::Display for CliDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determines which dialect a binary speaks.
pub trait CapabilityProbe {
    fn probe(&self, bin: &Path) -> CliDialect;
}

/// Classify usage text into a dialect.
///
/// Unrecognized text maps to [`CliDialect::Minimal`]: a minimal command
/// still runs on a full build, the reverse does not.
#[must_use]
pub fn classify_help_text(text: &str) -> CliDialect {
    if text.contains("Usage: iwasm") {
        return CliDialect::Full;
    }
    if text.contains("Required arguments:") {
        return CliDialect::Minimal;
    }
    if ["--dir=<dir>", "--dir=", "\n  --dir"]
        .iter()
        .any(|needle| text.contains(needle))
    {
        return CliDialect::Full;
    }
    CliDialect::Minimal
}
