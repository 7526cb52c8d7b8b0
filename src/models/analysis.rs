//! Weekly analysis records as returned by the language model.
//!
//! Nothing in a model response is guaranteed. A record keeps the reply
//! exactly as returned, plus the metadata stamped by the analyzer; the typed
//! accessors are read views where a wrongly shaped value reads as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{lenient, read_list, str_field};

/// Read view of one entry of `patterns`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pattern {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
}

/// Topics come back either as `{"topic", "count"}` objects or bare strings.
/// The count is printed as given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyTopic {
    Counted {
        topic: String,
        #[serde(default)]
        count: Option<Value>,
    },
    Plain(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyAnalysis(Map<String, Value>);

impl WeeklyAnalysis {
    /// Set or replace a top-level field, as the analyzer does for metadata.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn patterns(&self) -> Vec<Pattern> {
        read_list(&self.0, "patterns")
    }

    pub fn key_topics(&self) -> Vec<KeyTopic> {
        read_list(&self.0, "key_topics")
    }

    pub fn clinical_prompts(&self) -> Vec<String> {
        read_list(&self.0, "clinical_prompts")
    }

    pub fn strengths_observed(&self) -> Vec<String> {
        read_list(&self.0, "strengths_observed")
    }

    fn mood_trends(&self) -> Option<&Map<String, Value>> {
        self.0.get("mood_trends").and_then(Value::as_object)
    }

    pub fn overall_sentiment(&self) -> Option<&str> {
        self.mood_trends().and_then(|m| str_field(m, "overall_sentiment"))
    }

    pub fn sentiment_score(&self) -> Option<f64> {
        self.mood_trends()
            .and_then(|m| m.get("sentiment_score"))
            .and_then(Value::as_f64)
    }

    pub fn mood_shift(&self) -> Option<&str> {
        self.mood_trends().and_then(|m| str_field(m, "mood_shift"))
    }

    /// Title of the first pattern the model listed.
    pub fn primary_theme(&self) -> Option<&str> {
        self.0
            .get("patterns")
            .and_then(Value::as_array)
            .and_then(|patterns| patterns.first())
            .and_then(|pattern| pattern.get("title"))
            .and_then(Value::as_str)
    }

    pub fn analysis_date(&self) -> Option<&str> {
        str_field(&self.0, "analysis_date")
    }

    pub fn week_period(&self) -> Option<&str> {
        str_field(&self.0, "week_period")
    }

    pub fn entry_count(&self) -> Option<usize> {
        self.0
            .get("entry_count")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }
}

/// Failure reported as data instead of an error: oracle unavailable, response
/// not JSON, or nothing to analyze for the requested range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl AnalysisFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn with_exception(mut self, exception: impl ToString) -> Self {
        self.exception = Some(exception.to_string());
        self
    }

    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }

    pub fn with_week_period(mut self, period: impl Into<String>) -> Self {
        self.week_period = Some(period.into());
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }
}

/// Result of one model-backed analysis. Serializes flat: callers look for an
/// `error` key to tell the two apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome<T> {
    Failed(AnalysisFailure),
    Completed(T),
}

impl<T> AnalysisOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Completed(value) => Some(value),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&AnalysisFailure> {
        match self {
            AnalysisOutcome::Failed(failure) => Some(failure),
            AnalysisOutcome::Completed(_) => None,
        }
    }
}
