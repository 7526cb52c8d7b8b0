use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::analysis::AnalysisOutcome;
use super::{lenient, read_field};

/// Trajectory directions the comparison rule understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Improving,
    Declining,
    Stable,
    Fluctuating,
}

impl Direction {
    /// Exact, lowercase match only. `"Declining"` is not a known direction
    /// and ends up in the comparison's fallback text as written.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "improving" => Some(Direction::Improving),
            "declining" => Some(Direction::Declining),
            "stable" => Some(Direction::Stable),
            "fluctuating" => Some(Direction::Fluctuating),
            _ => None,
        }
    }
}

/// Read view of `trajectory`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trajectory {
    /// Kept as the raw string so unrecognised directions can still be reported.
    #[serde(default, deserialize_with = "lenient")]
    pub overall_direction: Option<String>,
}

impl Trajectory {
    pub fn direction(&self) -> Option<Direction> {
        self.overall_direction.as_deref().and_then(Direction::parse)
    }
}

/// Consolidated view over every weekly analysis in a date window, kept
/// exactly as the model returned it plus `analysis_date`. Recomputed on each
/// request; it has no identity beyond the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LongTermAnalysis(Map<String, Value>);

impl LongTermAnalysis {
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn trajectory(&self) -> Option<Trajectory> {
        read_field(&self.0, "trajectory")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodReport {
    pub range: String,
    pub analysis: AnalysisOutcome<LongTermAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub sentiment_change: String,
    pub pattern_evolution: String,
    pub improvement_noted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub period_1: PeriodReport,
    pub period_2: PeriodReport,
    pub comparison_summary: ComparisonSummary,
}
