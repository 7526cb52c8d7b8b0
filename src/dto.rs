//! # Journal Insights: Request/Response DTOs
//!
//! All API contract types in one module.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Response` → serialized to client JSON
//! - All validation is expressed via `validator` derive macros
//! - `patient_id` defaults to the shared `default` patient when omitted

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::analysis::{AnalysisOutcome, Pattern, WeeklyAnalysis};
use crate::models::entry::JournalEntry;
use crate::models::format_period;
use crate::models::packet::WeeklyPacket;
use crate::models::trends::{Comparison, LongTermAnalysis};
use crate::services::today_stamp;
use crate::storage::keys::parse_summary_key;
use crate::storage::patients::DEFAULT_PATIENT_ID;

fn default_patient_id() -> String {
    DEFAULT_PATIENT_ID.to_string()
}

// ============================================================================
// Common
// ============================================================================

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// An inclusive date range as sent by clients.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ============================================================================
// Entries
// ============================================================================

/// POST /api/entries
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEntryRequest {
    #[serde(default = "default_patient_id")]
    #[validate(custom = "crate::storage::patients::validate_patient_id")]
    pub patient_id: String,

    /// Google Docs URL, document id behind a URL, or the entry text itself
    #[validate(length(min = 1, message = "doc_url is required"))]
    pub doc_url: String,

    /// Used when the document carries no `Date:` marker
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub success: bool,
    pub message: &'static str,
    pub entry: JournalEntry,
    pub file: String,
}

// ============================================================================
// Weekly pipeline
// ============================================================================

/// POST /api/aggregate-week and POST /api/analyze-week
#[derive(Debug, Deserialize, Validate)]
pub struct WeekRangeRequest {
    #[serde(default = "default_patient_id")]
    #[validate(custom = "crate::storage::patients::validate_patient_id")]
    pub patient_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DocSource {
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
    pub date: Option<NaiveDate>,
}

/// POST /api/process-full-pipeline
#[derive(Debug, Deserialize, Validate)]
pub struct PipelineRequest {
    #[serde(default = "default_patient_id")]
    #[validate(custom = "crate::storage::patients::validate_patient_id")]
    pub patient_id: String,

    #[serde(default)]
    #[validate]
    pub doc_urls: Vec<DocSource>,

    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub success: bool,
    pub message: &'static str,
    pub entry_count: usize,
    pub missing_days: usize,
    pub file: String,
    pub weekly_data: WeeklyPacket,
}

/// Three-part digest of a weekly analysis shown to the therapist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekInsight {
    pub theme: String,
    pub summary: String,
    pub plan: Vec<String>,
}

impl WeekInsight {
    pub fn from_analysis(analysis: &WeeklyAnalysis, packet: &WeeklyPacket) -> Self {
        let mut summary = format!(
            "Week of {}. Analyzed {} journal entries. Overall mood: {} (score: {:.2}).",
            format_period(packet.week_start, packet.week_end),
            packet.entry_count(),
            analysis.overall_sentiment().unwrap_or("neutral"),
            analysis.sentiment_score().unwrap_or(0.0),
        );

        let patterns = analysis.patterns();
        let concerns: Vec<&str> = patterns
            .iter()
            .take(3)
            .map(|p| p.title.as_deref().unwrap_or(""))
            .collect();
        if !concerns.is_empty() {
            summary.push_str(&format!(" Primary concerns: {}.", concerns.join(", ")));
        }

        Self {
            theme: analysis
                .primary_theme()
                .unwrap_or("Weekly Insights")
                .to_string(),
            summary,
            plan: analysis.clinical_prompts(),
        }
    }
}

/// POST /api/analyze-week: the digest, or the failure reported as data
pub type WeekInsightResponse = AnalysisOutcome<WeekInsight>;

#[derive(Debug, Serialize)]
pub struct AggregationInfo {
    pub entry_count: usize,
    pub file: String,
}

/// POST /api/process-full-pipeline
#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    #[serde(flatten)]
    pub result: WeekInsightResponse,
    pub converted_entries: Vec<JournalEntry>,
    pub aggregation: AggregationInfo,
}

// ============================================================================
// Long-term trends
// ============================================================================

/// POST /api/analyze-long-term
#[derive(Debug, Deserialize, Validate)]
pub struct LongTermRequest {
    #[serde(default = "default_patient_id")]
    #[validate(custom = "crate::storage::patients::validate_patient_id")]
    pub patient_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct LongTermResponse {
    pub success: bool,
    pub analysis: AnalysisOutcome<LongTermAnalysis>,
    /// Only set when the analysis completed and was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// POST /api/compare-periods
#[derive(Debug, Deserialize, Validate)]
pub struct ComparePeriodsRequest {
    #[serde(default = "default_patient_id")]
    #[validate(custom = "crate::storage::patients::validate_patient_id")]
    pub patient_id: String,
    pub period1: PeriodRange,
    pub period2: PeriodRange,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub comparison: Comparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBounds {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct PatientSummary {
    pub patient_id: String,
    pub name: String,
    pub therapist: Option<String>,
    pub entry_count: usize,
    pub latest_week: Option<WeekBounds>,
}

/// GET /api/patients
#[derive(Debug, Serialize)]
pub struct PatientListResponse {
    pub patients: Vec<PatientSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternView {
    pub name: String,
    pub severity: String,
    pub description: String,
}

impl From<&Pattern> for PatternView {
    fn from(pattern: &Pattern) -> Self {
        Self {
            name: pattern.title.clone().unwrap_or_else(|| "Pattern".into()),
            severity: pattern
                .severity
                .clone()
                .unwrap_or_else(|| "moderate".into()),
            description: pattern.description.clone().unwrap_or_default(),
        }
    }
}

/// A stored weekly analysis flattened for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyAnalysisView {
    pub id: String,
    pub patient_id: String,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
    pub entries_analyzed: usize,
    pub overall_mood: String,
    pub sentiment_score: f64,
    pub themes: String,
    pub theme_title: String,
    pub patterns: Vec<PatternView>,
    pub mood_description: String,
    pub clinical_prompts: Vec<String>,
    pub strengths: Vec<String>,
    pub created_at: String,
}

impl WeeklyAnalysisView {
    /// Week bounds come from the file name, falling back to `week_period`.
    pub fn build(analysis: &WeeklyAnalysis, patient_id: &str, filename: &str) -> Self {
        let (week_start, week_end) = match parse_summary_key(filename) {
            Some((start, end)) => (Some(start.to_string()), Some(end.to_string())),
            None => match analysis.week_period() {
                Some(period) => match period.split_once(" to ") {
                    Some((start, end)) => (Some(start.to_string()), Some(end.to_string())),
                    None => (Some(period.to_string()), Some(String::new())),
                },
                None => (None, None),
            },
        };

        let raw_patterns = analysis.patterns();
        let patterns: Vec<PatternView> = raw_patterns.iter().map(PatternView::from).collect();
        let themes = raw_patterns
            .iter()
            .map(|p| p.description.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        let themes = if themes.is_empty() {
            analysis
                .week_period()
                .unwrap_or("Weekly insights")
                .to_string()
        } else {
            themes
        };

        Self {
            id: filename.to_string(),
            patient_id: patient_id.to_string(),
            week_start,
            week_end,
            entries_analyzed: analysis.entry_count().unwrap_or(0),
            overall_mood: analysis.overall_sentiment().unwrap_or("neutral").to_string(),
            sentiment_score: analysis.sentiment_score().unwrap_or(0.0),
            themes,
            theme_title: patterns
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Weekly Insights".into()),
            patterns,
            mood_description: analysis.mood_shift().unwrap_or_default().to_string(),
            clinical_prompts: analysis.clinical_prompts(),
            strengths: analysis.strengths_observed(),
            created_at: analysis
                .analysis_date()
                .map(str::to_string)
                .unwrap_or_else(today_stamp),
        }
    }
}

/// GET /api/patients/:patient_id/analyses
#[derive(Debug, Serialize)]
pub struct AnalysesResponse {
    pub analyses: Vec<WeeklyAnalysisView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(entries: usize) -> WeeklyPacket {
        let start = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
        WeeklyPacket {
            patient_id: "default".into(),
            week_start: start,
            week_end: NaiveDate::from_ymd_opt(2025, 1, 18).unwrap(),
            entries: (0..entries)
                .map(|i| JournalEntry {
                    date: start + chrono::Duration::days(i as i64),
                    time: None,
                    text: "entry".into(),
                })
                .collect(),
            missing_days: vec![],
        }
    }

    #[test]
    fn test_week_insight_summary_text() {
        let analysis: WeeklyAnalysis = serde_json::from_str(
            r#"{
                "patterns": [{"title": "Work stress"}, {"title": "Poor sleep"}, {"title": "Isolation"}, {"title": "Fourth"}],
                "mood_trends": {"overall_sentiment": "negative", "sentiment_score": -0.456},
                "clinical_prompts": ["Ask about deadlines"]
            }"#,
        )
        .unwrap();

        let insight = WeekInsight::from_analysis(&analysis, &packet(3));
        assert_eq!(insight.theme, "Work stress");
        assert_eq!(
            insight.summary,
            "Week of 2025-01-12 to 2025-01-18. Analyzed 3 journal entries. Overall mood: negative (score: -0.46). Primary concerns: Work stress, Poor sleep, Isolation."
        );
        assert_eq!(insight.plan, vec!["Ask about deadlines".to_string()]);
    }

    #[test]
    fn test_week_insight_defaults() {
        let insight = WeekInsight::from_analysis(&WeeklyAnalysis::default(), &packet(1));
        assert_eq!(insight.theme, "Weekly Insights");
        assert!(insight.summary.ends_with("Overall mood: neutral (score: 0.00)."));
        assert!(insight.plan.is_empty());
    }

    #[test]
    fn test_view_takes_week_from_filename() {
        let analysis: WeeklyAnalysis = serde_json::from_str(
            r#"{"week_period": "2024-12-30 to 2025-01-05",
                "patterns": [{"title": "Grief", "description": "Talks about loss."}, {"description": "Sleeps late."}],
                "entry_count": 5, "analysis_date": "2025-01-06"}"#,
        )
        .unwrap();

        let view = WeeklyAnalysisView::build(&analysis, "alex-kim", "summary_2025-01-06_to_2025-01-12.json");
        assert_eq!(view.week_start.as_deref(), Some("2025-01-06"));
        assert_eq!(view.week_end.as_deref(), Some("2025-01-12"));
        assert_eq!(view.theme_title, "Grief");
        assert_eq!(view.themes, "Talks about loss. Sleeps late.");
        assert_eq!(view.patterns[1].name, "Pattern");
        assert_eq!(view.patterns[1].severity, "moderate");
        assert_eq!(view.overall_mood, "neutral");
        assert_eq!(view.entries_analyzed, 5);
        assert_eq!(view.created_at, "2025-01-06");
    }

    #[test]
    fn test_view_falls_back_to_week_period() {
        let analysis: WeeklyAnalysis =
            serde_json::from_str(r#"{"week_period": "2025-01-06 to 2025-01-12"}"#).unwrap();
        let view = WeeklyAnalysisView::build(&analysis, "default", "summary_custom.json");
        assert_eq!(view.week_start.as_deref(), Some("2025-01-06"));
        assert_eq!(view.week_end.as_deref(), Some("2025-01-12"));
        assert_eq!(view.themes, "2025-01-06 to 2025-01-12");
        assert_eq!(view.theme_title, "Weekly Insights");
    }

    #[test]
    fn test_request_defaults_patient_and_validates_id() {
        let req: WeekRangeRequest =
            serde_json::from_str(r#"{"week_start": "2025-01-12", "week_end": "2025-01-18"}"#).unwrap();
        assert_eq!(req.patient_id, "default");
        assert!(req.validate().is_ok());

        let bad: WeekRangeRequest = serde_json::from_str(
            r#"{"patient_id": "../etc", "week_start": "2025-01-12", "week_end": "2025-01-18"}"#,
        )
        .unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_pipeline_request_validates_nested_sources() {
        let req: PipelineRequest = serde_json::from_str(
            r#"{"doc_urls": [{"url": ""}], "week_start": "2025-01-12", "week_end": "2025-01-18"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
