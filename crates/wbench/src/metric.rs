//! Timing signal extraction and metric selection.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Extracts a self-reported duration (in ms) from process output.
pub trait MetricExtractor {
    fn extract(&self, text: &str) -> Option<f64>;
}

static TIME_LINE: OnceLock<Option<Regex>> = OnceLock::new();

/// Recognizes `Elapsed time: N ms`, `Elapsed: N ms` and `Time: N ms` lines.
///
/// Matching is case-insensitive and anchored at line starts. When a
/// workload prints several timings, the last one in the text wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeLineExtractor;

impl TimeLineExtractor {
    fn pattern() -> Option<&'static Regex> {
        TIME_LINE
            .get_or_init(|| {
                Regex::new(r"(?mi)^(?:elapsed time|elapsed|time):\s*(\d+(?:\.\d+)?)\s*ms\b").ok()
            })
            .as_ref()
    }
}

impl MetricExtractor for TimeLineExtractor {
    fn extract(&self, text: &str) -> Option<f64> {
        Self::pattern()?
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
            .last()
    }
}

/// Which measurement a recorded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Harness wall-clock time around the process.
    Wall,
    /// Time printed by the workload itself.
    Internal,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Internal => "internal",
        }
    }
}

/// Which measurement statistics are computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricPolicy {
    Wall,
    Internal,
    #[default]
    Auto,
}

impl MetricPolicy {
    pub const ALL: &'static [Self] = &[Self::Wall, Self::Internal, Self::Auto];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Internal => "internal",
            Self::Auto => "auto",
        }
    }

    /// One-line meaning, recorded in the result artifact.
    #[must_use]
    pub const fn semantics(self) -> &'static str {
        match self {
            Self::Wall => "wall-clock time measured by the harness around the engine process",
            Self::Internal => "time printed by the workload itself; runs without it are unmeasured",
            Self::Auto => "workload-printed time when present, otherwise harness wall-clock time",
        }
    }

    /// Select the value this policy uses.
    ///
    /// `Internal` never substitutes wall time for a missing internal value.
    #[must_use]
    pub const fn resolve(self, wall_ms: f64, internal_ms: Option<f64>) -> (MetricKind, Option<f64>) {
        match (self, internal_ms) {
            (Self::Wall, _) => (MetricKind::Wall, Some(wall_ms)),
            (Self::Internal, internal) => (MetricKind::Internal, internal),
            (Self::Auto, Some(internal)) => (MetricKind::Internal, Some(internal)),
            (Self::Auto, None) => (MetricKind::Wall, Some(wall_ms)),
        }
    }
}

impl std::fmt::Display for MetricPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a value can enter statistics: strictly positive and finite.
#[must_use]
pub const fn is_usable(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}
