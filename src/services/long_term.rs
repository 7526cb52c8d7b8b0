//! Collects stored weekly analyses for a date window and renders them into
//! one text block for the trend synthesizer.

use std::fmt::Write;
use std::sync::Arc;

use chrono::NaiveDate;

use super::validate_range;
use crate::error::AppResult;
use crate::models::analysis::{KeyTopic, WeeklyAnalysis};
use crate::models::DATE_FORMAT;
use crate::storage::blob::BlobStore;
use crate::storage::blocking;
use crate::storage::keys::{JSON_SUFFIX, SUMMARY_PREFIX};

/// Start date of a stored week, or why the record cannot be placed in time.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodStart {
    Date(NaiveDate),
    Skip(String),
}

/// Left side of `"<start> to <end>"`.
pub fn period_start(week_period: Option<&str>) -> PeriodStart {
    let Some(period) = week_period.filter(|p| !p.is_empty()) else {
        return PeriodStart::Skip("missing week_period".into());
    };
    let start = period.split(" to ").next().unwrap_or(period).trim();
    match NaiveDate::parse_from_str(start, DATE_FORMAT) {
        Ok(date) => PeriodStart::Date(date),
        Err(e) => PeriodStart::Skip(format!("week_period {period:?}: {e}")),
    }
}

/// Every stored weekly analysis whose week *starts* inside `[start, end]`,
/// ordered by `week_period`.
///
/// Only the start date is tested: a week starting before the window is left
/// out even when it ends inside it, and a week starting inside is kept whole.
/// Records that cannot be read or dated are logged and skipped.
pub fn collect_summaries(
    store: &dyn BlobStore,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<WeeklyAnalysis>> {
    validate_range(start, end)?;

    let mut summaries = Vec::new();
    for key in store.list_keys(SUMMARY_PREFIX)? {
        if !key.ends_with(JSON_SUFFIX) {
            continue;
        }
        let Some(bytes) = store.get(&key)? else {
            continue;
        };
        let summary: WeeklyAnalysis = match serde_json::from_slice(&bytes) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(key = %key, reason = %e, "Skipping unreadable weekly summary");
                continue;
            }
        };

        match period_start(summary.week_period()) {
            PeriodStart::Date(week_start) => {
                if start <= week_start && week_start <= end {
                    summaries.push(summary);
                }
            }
            PeriodStart::Skip(reason) => {
                tracing::warn!(key = %key, reason = %reason, "Skipping weekly summary");
            }
        }
    }

    // Zero-padded ISO dates: string order is calendar order
    summaries.sort_by(|a, b| a.week_period().cmp(&b.week_period()));
    Ok(summaries)
}

/// [`collect_summaries`] on the blocking pool.
pub async fn load_summaries(
    store: Arc<dyn BlobStore>,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<WeeklyAnalysis>> {
    blocking(move || collect_summaries(store.as_ref(), start, end)).await
}

/// One fixed-format block per week, in the given order.
pub fn format_weekly_summaries(summaries: &[WeeklyAnalysis]) -> String {
    summaries
        .iter()
        .map(format_week)
        .collect::<Vec<String>>()
        .join("\n")
}

fn format_week(summary: &WeeklyAnalysis) -> String {
    let mut text = String::new();
    let sentiment_score = summary
        .sentiment_score()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".into());

    // Writing into a String cannot fail
    let _ = write!(
        text,
        "\n--- Week: {} ---\nEntry Count: {}\nOverall Sentiment: {}\nSentiment Score: {}\n\nKey Patterns:\n",
        summary.week_period().unwrap_or("Unknown"),
        summary.entry_count().unwrap_or(0),
        summary.overall_sentiment().unwrap_or("N/A"),
        sentiment_score,
    );
    for pattern in summary.patterns() {
        let _ = writeln!(
            text,
            "  - {} (severity: {})",
            pattern.title.as_deref().unwrap_or("N/A"),
            pattern.severity.as_deref().unwrap_or("N/A"),
        );
    }

    text.push_str("\nKey Topics:\n");
    for topic in summary.key_topics() {
        let _ = match topic {
            KeyTopic::Counted { topic, count } => {
                let count = count.map(|c| c.to_string()).unwrap_or_else(|| "0".into());
                writeln!(text, "  - {} ({}x)", topic, count)
            }
            KeyTopic::Plain(topic) => writeln!(text, "  - {}", topic),
        };
    }

    text.push_str("\nClinical Prompts:\n");
    for prompt in summary.clinical_prompts().iter().take(3) {
        let _ = writeln!(text, "  - {}", prompt);
    }
    text
}
