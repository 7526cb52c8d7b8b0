use std::sync::Arc;

use super::oracle::{LlmOracle, OracleRequest};
use super::today_stamp;
use crate::config::LlmSettings;
use crate::models::analysis::{AnalysisFailure, AnalysisOutcome, WeeklyAnalysis};
use crate::models::format_date;
use crate::models::packet::WeeklyPacket;

const SYSTEM_INSTRUCTION: &str = "You are a clinical psychology AI assistant helping therapists analyze patient journal entries for patterns and insights.";

/// Turns one weekly packet into a structured analysis via the language model.
pub struct WeeklyAnalyzer {
    oracle: Arc<dyn LlmOracle>,
    settings: LlmSettings,
}

impl WeeklyAnalyzer {
    pub fn new(oracle: Arc<dyn LlmOracle>, settings: LlmSettings) -> Self {
        Self { oracle, settings }
    }

    /// Single attempt, no retry. Oracle and parse failures come back as
    /// `AnalysisOutcome::Failed`.
    pub async fn analyze(&self, packet: &WeeklyPacket) -> AnalysisOutcome<WeeklyAnalysis> {
        let week_period = packet.week_period();
        let prompt = build_weekly_prompt(packet);

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
                tracing::warn!(
                    patient_id = %packet.patient_id,
                    week_period = %week_period,
                    error = %e,
                    "Weekly analysis call failed"
                );
                return AnalysisOutcome::Failed(
                    AnalysisFailure::new("Analysis failed")
                        .with_exception(format!("{e:#}"))
                        .with_week_period(week_period),
                );
            }
        };

        let mut analysis: WeeklyAnalysis = match serde_json::from_str(&raw) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(
                    patient_id = %packet.patient_id,
                    week_period = %week_period,
                    error = %e,
                    "Weekly analysis response was not JSON"
                );
                return AnalysisOutcome::Failed(
                    AnalysisFailure::new("Failed to parse model response as JSON")
                        .with_raw_response(raw)
                        .with_exception(e),
                );
            }
        };

        analysis.insert("analysis_date", today_stamp());
        analysis.insert("week_period", week_period);
        analysis.insert("model_used", self.settings.model.as_str());
        analysis.insert("entry_count", packet.entry_count());

        tracing::info!(
            patient_id = %packet.patient_id,
            week_period = ?analysis.week_period(),
            model = %self.settings.model,
            patterns = analysis.patterns().len(),
            "Weekly analysis completed"
        );
        AnalysisOutcome::Completed(analysis)
    }
}

/// Each entry as a delimited date/time/text block.
pub fn format_entries(packet: &WeeklyPacket) -> String {
    packet
        .entries
        .iter()
        .map(|entry| {
            let time = entry
                .time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "Unknown".into());
            format!(
                "\nDate: {}\nTime: {}\n\n{}\n\n---\n",
                format_date(entry.date),
                time,
                entry.text
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn build_weekly_prompt(packet: &WeeklyPacket) -> String {
    format!(
        r#"You are reviewing one week of a patient's private journal entries ({period}) on behalf of their therapist.

Read every entry and identify:

1. **Patterns**: Recurring emotional, behavioural, or cognitive patterns, each with a severity.
2. **Mood Trends**: The overall sentiment of the week, a sentiment score from -1.0 (very negative) to 1.0 (very positive), and how mood shifted across the week.
3. **Key Topics**: The subjects the patient wrote about most, with how often each came up.
4. **Clinical Prompts**: Questions or openings the therapist could use in the next session.
5. **Strengths**: Coping skills, resilience, or positive behaviours the patient showed.
6. **Concerns**: Anything that may need closer clinical attention.

Base every observation on the entries themselves. Do not diagnose.

Return your analysis in JSON format:
{{
  "patterns": [
    {{
      "title": "Short pattern name",
      "severity": "low|moderate|high",
      "description": "What was observed and where"
    }}
  ],
  "mood_trends": {{
    "overall_sentiment": "positive|neutral|negative|mixed",
    "sentiment_score": 0.0,
    "mood_shift": "How mood changed over the week"
  }},
  "key_topics": [
    {{"topic": "Topic name", "count": 3}}
  ],
  "clinical_prompts": [
    "Question or discussion point for the session"
  ],
  "strengths_observed": [
    "Strength shown this week"
  ],
  "concerns": [
    "Concern worth following up"
  ]
}}

Journal Entries:
{entries}
"#,
        period = packet.week_period(),
        entries = format_entries(packet),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::JournalEntry;
    use crate::services::oracle::fake::ScriptedOracle;
    use chrono::{NaiveDate, NaiveTime};

    fn settings() -> LlmSettings {
        LlmSettings {
            api_key: "test".into(),
            model: "gpt-4o".into(),
            base_url: "http://127.0.0.1:9".into(),
            temperature: 0.3,
            timeout_secs: 1,
        }
    }

    fn packet() -> WeeklyPacket {
        WeeklyPacket {
            patient_id: "alex-kim".into(),
            week_start: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            entries: vec![
                JournalEntry {
                    date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                    time: NaiveTime::from_hms_opt(22, 30, 0),
                    text: "Couldn't sleep before the review.".into(),
                },
                JournalEntry {
                    date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
                    time: None,
                    text: "Walked with my sister.".into(),
                },
            ],
            missing_days: vec![],
        }
    }

    #[test]
    fn test_format_entries_blocks() {
        let text = format_entries(&packet());
        assert!(text.contains("Date: 2025-01-06\nTime: 22:30\n\nCouldn't sleep before the review."));
        assert!(text.contains("Date: 2025-01-08\nTime: Unknown"));
        assert_eq!(text.matches("---").count(), 2);
    }

    #[tokio::test]
    async fn test_success_is_stamped_with_metadata() {
        let oracle = Arc::new(ScriptedOracle::new().reply(
            r#"{"patterns": [{"title": "Anticipatory anxiety", "severity": "moderate"}],
                "mood_trends": {"overall_sentiment": "mixed", "sentiment_score": -0.1}}"#,
        ));
        let analyzer = WeeklyAnalyzer::new(oracle.clone(), settings());

        let outcome = analyzer.analyze(&packet()).await;
        let analysis = outcome.completed().expect("analysis should complete");
        assert_eq!(analysis.week_period(), Some("2025-01-06 to 2025-01-12"));
        assert_eq!(analysis.entry_count(), Some(2));
        assert!(analysis.analysis_date().is_some());
        let stored = serde_json::to_value(analysis).unwrap();
        assert_eq!(stored["model_used"], "gpt-4o");
        assert_eq!(analysis.primary_theme(), Some("Anticipatory anxiety"));

        let requests = oracle.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].response_is_json);
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].system_instruction, SYSTEM_INSTRUCTION);
        assert!(requests[0].user_prompt.contains("Walked with my sister."));
    }

    #[tokio::test]
    async fn test_oracle_failure_is_reported_as_data() {
        let oracle = Arc::new(ScriptedOracle::new().fail("connection refused"));
        let analyzer = WeeklyAnalyzer::new(oracle, settings());

        let outcome = analyzer.analyze(&packet()).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "Analysis failed");
        assert_eq!(json["exception"], "connection refused");
        assert_eq!(json["week_period"], "2025-01-06 to 2025-01-12");
    }

    #[tokio::test]
    async fn test_non_json_reply_keeps_raw_response() {
        let oracle = Arc::new(ScriptedOracle::new().reply("Here is my analysis: the week was hard."));
        let analyzer = WeeklyAnalyzer::new(oracle, settings());

        let outcome = analyzer.analyze(&packet()).await;
        let failure = outcome.failure().expect("should fail to parse");
        assert_eq!(failure.error, "Failed to parse model response as JSON");
        assert_eq!(
            failure.raw_response.as_deref(),
            Some("Here is my analysis: the week was hard.")
        );
        assert!(failure.exception.is_some());
    }

    #[tokio::test]
    async fn test_json_array_reply_is_a_parse_failure() {
        let oracle = Arc::new(ScriptedOracle::new().reply("[1, 2, 3]"));
        let analyzer = WeeklyAnalyzer::new(oracle, settings());
        assert!(analyzer.analyze(&packet()).await.is_failed());
    }
}
