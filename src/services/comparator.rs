use std::sync::Arc;

use chrono::NaiveDate;

use super::long_term::load_summaries;
use super::synthesizer::TrendSynthesizer;
use super::validate_range;
use crate::error::AppResult;
use crate::models::analysis::AnalysisOutcome;
use crate::models::format_period;
use crate::models::trends::{Comparison, ComparisonSummary, Direction, LongTermAnalysis, PeriodReport};
use crate::storage::blob::BlobStore;

/// Run a full long-term analysis for each period and classify the change
/// between them.
///
/// The two runs share nothing. A period without summaries is reported as
/// failure data inside its report instead of failing the comparison.
pub async fn compare_periods(
    store: Arc<dyn BlobStore>,
    synthesizer: &TrendSynthesizer,
    period1_start: NaiveDate,
    period1_end: NaiveDate,
    period2_start: NaiveDate,
    period2_end: NaiveDate,
) -> AppResult<Comparison> {
    validate_range(period1_start, period1_end)?;
    validate_range(period2_start, period2_end)?;

    let period_1 = period_report(store.clone(), synthesizer, period1_start, period1_end).await?;
    let period_2 = period_report(store, synthesizer, period2_start, period2_end).await?;
    let comparison_summary = summarize_comparison(&period_1.analysis, &period_2.analysis);

    tracing::info!(
        period_1 = %period_1.range,
        period_2 = %period_2.range,
        sentiment_change = %comparison_summary.sentiment_change,
        "Periods compared"
    );
    Ok(Comparison {
        period_1,
        period_2,
        comparison_summary,
    })
}

async fn period_report(
    store: Arc<dyn BlobStore>,
    synthesizer: &TrendSynthesizer,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<PeriodReport> {
    let summaries = load_summaries(store, start, end).await?;
    Ok(PeriodReport {
        range: format_period(start, end),
        analysis: synthesizer.synthesize(&summaries, start, end).await,
    })
}

/// Three-way rule on the categorical trajectory directions only.
pub fn summarize_comparison(
    first: &AnalysisOutcome<LongTermAnalysis>,
    second: &AnalysisOutcome<LongTermAnalysis>,
) -> ComparisonSummary {
    let mut summary = ComparisonSummary {
        sentiment_change: "N/A".into(),
        pattern_evolution: "N/A".into(),
        improvement_noted: false,
    };

    let trajectories = (
        first.completed().and_then(LongTermAnalysis::trajectory),
        second.completed().and_then(LongTermAnalysis::trajectory),
    );
    let (Some(t1), Some(t2)) = trajectories else {
        return summary;
    };

    match (t1.direction(), t2.direction()) {
        (Some(Direction::Declining), Some(Direction::Improving)) => {
            summary.sentiment_change = "Significant improvement".into();
            summary.improvement_noted = true;
        }
        (Some(Direction::Improving), Some(Direction::Declining)) => {
            summary.sentiment_change = "Concerning decline".into();
        }
        _ => {
            summary.sentiment_change = format!(
                "Period 1: {}, Period 2: {}",
                t1.overall_direction.as_deref().unwrap_or(""),
                t2.overall_direction.as_deref().unwrap_or(""),
            );
        }
    }
    summary
}
