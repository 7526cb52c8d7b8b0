use std::sync::Arc;

use chrono::NaiveDate;

use super::long_term::{format_weekly_summaries, load_summaries};
use super::oracle::{LlmOracle, OracleRequest};
use super::today_stamp;
use crate::config::LlmSettings;
use crate::error::{AppError, AppResult};
use crate::models::analysis::{AnalysisFailure, AnalysisOutcome, WeeklyAnalysis};
use crate::models::{format_date, format_period};
use crate::models::trends::LongTermAnalysis;
use crate::storage::blob::BlobStore;

const SYSTEM_INSTRUCTION: &str =
    "You are an expert clinical psychologist analyzing long-term patient journal patterns.";

pub const NO_SUMMARIES: &str = "No weekly summaries found in the specified range";

/// Asks the language model for meta-patterns across a run of weekly analyses.
pub struct TrendSynthesizer {
    oracle: Arc<dyn LlmOracle>,
    settings: LlmSettings,
}

impl TrendSynthesizer {
    pub fn new(oracle: Arc<dyn LlmOracle>, settings: LlmSettings) -> Self {
        Self { oracle, settings }
    }

    /// `summaries` must already be in chronological order. An empty slice
    /// reports the no-data condition without calling the model.
    pub async fn synthesize(
        &self,
        summaries: &[WeeklyAnalysis],
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalysisOutcome<LongTermAnalysis> {
        let period = format_period(start, end);
        if summaries.is_empty() {
            return AnalysisOutcome::Failed(
                AnalysisFailure::new(NO_SUMMARIES).with_range(format_date(start), format_date(end)),
            );
        }

        let prompt = build_long_term_prompt(summaries, start, end);
        let raw = match self
            .oracle
            .complete(OracleRequest {
                system_instruction: SYSTEM_INSTRUCTION,
                user_prompt: &prompt,
                model: &self.settings.model,
                temperature: self.settings.temperature,
                response_is_json: true,
            })
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(period = %period, error = %e, "Long-term analysis call failed");
                return AnalysisOutcome::Failed(
                    AnalysisFailure::new("Long-term analysis failed")
                        .with_exception(format!("{e:#}"))
                        .with_period(period),
                );
            }
        };

        match serde_json::from_str::<LongTermAnalysis>(&raw) {
            Ok(mut analysis) => {
                analysis.insert("analysis_date", today_stamp());
                tracing::info!(
                    period = %period,
                    weeks = summaries.len(),
                    model = %self.settings.model,
                    "Long-term analysis completed"
                );
                AnalysisOutcome::Completed(analysis)
            }
            Err(e) => {
                tracing::warn!(period = %period, error = %e, "Long-term response was not JSON");
                AnalysisOutcome::Failed(
                    AnalysisFailure::new("Long-term analysis failed")
                        .with_exception(e)
                        .with_raw_response(raw)
                        .with_period(period),
                )
            }
        }
    }
}

/// Collect the window's weekly analyses and synthesize them.
///
/// An empty window is `NotFound`; the model is not called.
pub async fn analyze_long_term_trends(
    store: Arc<dyn BlobStore>,
    synthesizer: &TrendSynthesizer,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<AnalysisOutcome<LongTermAnalysis>> {
    let summaries = load_summaries(store, start, end).await?;
    if summaries.is_empty() {
        return Err(AppError::NotFound(format!(
            "{} ({})",
            NO_SUMMARIES,
            format_period(start, end)
        )));
    }
    Ok(synthesizer.synthesize(&summaries, start, end).await)
}

pub fn build_long_term_prompt(summaries: &[WeeklyAnalysis], start: NaiveDate, end: NaiveDate) -> String {
    let period = format_period(start, end);
    let weeks = summaries.len();
    format!(
        r#"You are analyzing long-term patterns in a patient's journal entries.

You have access to {weeks} weeks of analysis summaries from {period}.

Analyze these weekly summaries to identify:

1. **Meta-Patterns**: Recurring themes that persist across multiple weeks
2. **Trajectory**: Is the patient's emotional state improving, declining, or stable?
3. **Cyclical Patterns**: Do certain issues appear and disappear in cycles?
4. **Persistent Concerns**: What issues remain unresolved across the entire period?
5. **Progress Indicators**: What positive changes or coping improvements are evident?
6. **Treatment Recommendations**: Based on long-term patterns, what therapeutic approaches might be most effective?

Return your analysis in JSON format:
{{
  "analysis_period": "{period}",
  "weeks_analyzed": {weeks},
  "meta_patterns": [
    {{
      "theme": "Theme name",
      "description": "Detailed description",
      "weeks_present": ["week1", "week2"],
      "severity_trend": "increasing|decreasing|stable",
      "first_observed": "date",
      "last_observed": "date"
    }}
  ],
  "trajectory": {{
    "overall_direction": "improving|declining|stable|fluctuating",
    "sentiment_progression": [-0.3, -0.2, -0.1, 0.0],
    "narrative": "Description of emotional trajectory"
  }},
  "cyclical_patterns": [
    {{
      "pattern": "Description",
      "frequency": "weekly|biweekly|monthly",
      "trigger": "If identifiable"
    }}
  ],
  "persistent_concerns": [
    {{
      "concern": "Issue description",
      "severity": "low|moderate|high",
      "weeks_present": 5,
      "evolution": "How it has changed over time"
    }}
  ],
  "progress_indicators": [
    "Positive changes observed"
  ],
  "treatment_recommendations": [
    {{
      "approach": "Therapeutic approach or intervention",
      "rationale": "Why this is recommended based on patterns",
      "priority": "high|medium|low"
    }}
  ]
}}

Weekly Summaries:
{summaries}
"#,
        summaries = format_weekly_summaries(summaries),
    )
}
