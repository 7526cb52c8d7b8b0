//! Turns Google Docs or pasted text into daily journal entries.

use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::entry::{parse_clock, JournalEntry};
use crate::models::DATE_FORMAT;

static DOC_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/document/d/([a-zA-Z0-9_-]+)").expect("valid regex"));

static DATE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Date:\s*(\d{4}-\d{2}-\d{2})").expect("valid regex"));

static TIME_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Time:\s*(\d{2}:\d{2})").expect("valid regex"));

const DOCS_TIMEOUT_SECS: u64 = 30;

/// Document id from a Google Docs URL; anything else is taken to be an id.
pub fn extract_doc_id(url: &str) -> &str {
    DOC_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(url)
}

/// Concatenated text runs of every paragraph in a Docs API document.
pub fn flatten_doc_text(document: &Value) -> String {
    let Some(content) = document.pointer("/body/content").and_then(Value::as_array) else {
        return String::new();
    };

    let mut text = String::new();
    for block in content {
        let Some(elements) = block.pointer("/paragraph/elements").and_then(Value::as_array) else {
            continue;
        };
        for element in elements {
            if let Some(run) = element.pointer("/textRun/content").and_then(Value::as_str) {
                text.push_str(run);
            }
        }
    }
    text
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDoc {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub text: String,
}

/// Reads the `Date:` / `Time:` header. The journal text is whatever follows
/// the later of the two markers.
pub fn parse_doc_text(full_text: &str) -> ParsedDoc {
    let date_match = DATE_MARKER_RE.captures(full_text);
    let time_match = TIME_MARKER_RE.captures(full_text);

    let mut text_start = 0;
    for caps in [&date_match, &time_match].into_iter().flatten() {
        if let Some(whole) = caps.get(0) {
            text_start = text_start.max(whole.end());
        }
    }

    let date = date_match
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| match NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(value = %m.as_str(), reason = %e, "Ignoring invalid Date marker");
                None
            }
        });
    let time = time_match
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_clock(m.as_str()));

    ParsedDoc {
        date,
        time,
        text: full_text[text_start..].trim().to_string(),
    }
}

fn midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default()
}

fn minute_of(now: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or_else(midnight)
}

/// Plain text as an entry. Date defaults to today, time to the current minute.
pub fn convert_text(
    text: &str,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    now: NaiveDateTime,
) -> JournalEntry {
    JournalEntry {
        date: date.unwrap_or(now.date()),
        time: Some(time.unwrap_or_else(|| minute_of(now))),
        text: text.to_string(),
    }
}

/// Read-only Google Docs API client authorised with a bearer token.
pub struct GoogleDocsClient {
    http: Client,
    access_token: String,
    base_url: String,
}

impl GoogleDocsClient {
    pub fn new(access_token: impl Into<String>, base_url: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DOCS_TIMEOUT_SECS))
            .build()
            .context("build Google Docs HTTP client")?;
        Ok(Self {
            http,
            access_token: access_token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_document(&self, doc_id: &str) -> anyhow::Result<Value> {
        let response = self
            .http
            .get(format!("{}/documents/{}", self.base_url, doc_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("send Google Docs request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("Google Docs request failed {}: {}", status, text);
        }

        response.json().await.context("decode Google Docs document")
    }
}

/// Anything not starting with `http` is the entry text itself. URLs are
/// fetched and parsed; a date found in the document wins over `entry_date`.
pub async fn convert_document(
    docs: Option<&GoogleDocsClient>,
    doc_url: &str,
    entry_date: Option<NaiveDate>,
    now: NaiveDateTime,
) -> AppResult<JournalEntry> {
    if !doc_url.starts_with("http") {
        return Ok(convert_text(doc_url, entry_date, None, now));
    }

    let Some(docs) = docs else {
        return Err(AppError::Validation(
            "Google Docs access is not configured; pass the entry as plain text instead of a URL"
                .into(),
        ));
    };

    let doc_id = extract_doc_id(doc_url);
    let document = docs
        .fetch_document(doc_id)
        .await
        .with_context(|| format!("Failed to convert Google Doc {doc_id}"))?;
    let parsed = parse_doc_text(&flatten_doc_text(&document));

    tracing::info!(doc_id = %doc_id, found_date = parsed.date.is_some(), "Google Doc converted");
    Ok(JournalEntry {
        date: parsed.date.or(entry_date).unwrap_or(now.date()),
        time: Some(parsed.time.unwrap_or_else(midnight)),
        text: parsed.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(21, 45, 33)
            .unwrap()
    }

    fn doc(paragraphs: &[&str]) -> Value {
        let content: Vec<Value> = paragraphs
            .iter()
            .map(|p| serde_json::json!({"paragraph": {"elements": [{"textRun": {"content": p}}]}}))
            .collect();
        serde_json::json!({"body": {"content": content}})
    }

    #[test]
    fn test_extract_doc_id() {
        assert_eq!(
            extract_doc_id("https://docs.google.com/document/d/1AbC-d_9/edit?usp=sharing"),
            "1AbC-d_9"
        );
        assert_eq!(extract_doc_id("1AbC-d_9"), "1AbC-d_9");
    }

    #[test]
    fn test_flatten_skips_non_paragraph_blocks() {
        let mut document = doc(&["Date: 2025-01-12\n", "Slept badly.\n"]);
        document["body"]["content"]
            .as_array_mut()
            .unwrap()
            .insert(0, serde_json::json!({"sectionBreak": {}}));
        assert_eq!(flatten_doc_text(&document), "Date: 2025-01-12\nSlept badly.\n");
        assert_eq!(flatten_doc_text(&serde_json::json!({})), "");
    }

    #[test]
    fn test_parse_doc_text_reads_header() {
        let parsed = parse_doc_text("date: 2025-01-12\nTIME: 22:30\n\n  Long day at work.  \n");
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 1, 12));
        assert_eq!(parsed.time, NaiveTime::from_hms_opt(22, 30, 0));
        assert_eq!(parsed.text, "Long day at work.");
    }

    #[test]
    fn test_parse_doc_text_without_markers_keeps_everything() {
        let parsed = parse_doc_text("  Just some thoughts.\n");
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.time, None);
        assert_eq!(parsed.text, "Just some thoughts.");
    }

    #[test]
    fn test_parse_doc_text_ignores_impossible_date() {
        let parsed = parse_doc_text("Date: 2025-13-45\nText");
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.text, "Text");
    }

    #[test]
    fn test_convert_text_defaults() {
        let entry = convert_text("hello", None, None, now());
        assert_eq!(entry.date, now().date());
        assert_eq!(entry.time, NaiveTime::from_hms_opt(21, 45, 0));

        let dated = convert_text("hello", NaiveDate::from_ymd_opt(2025, 1, 2), None, now());
        assert_eq!(dated.date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[tokio::test]
    async fn test_plain_text_needs_no_client() {
        let entry = convert_document(None, "Felt calmer today.", NaiveDate::from_ymd_opt(2025, 1, 12), now())
            .await
            .unwrap();
        assert_eq!(entry.text, "Felt calmer today.");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
    }

    #[tokio::test]
    async fn test_url_without_client_is_validation_error() {
        let result = convert_document(None, "https://docs.google.com/document/d/abc/edit", None, now()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_document_is_fetched_and_parsed() {
        let app = Router::new().route(
            "/documents/:id",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                let authorised = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer docs-token");
                assert!(authorised);
                assert_eq!(id, "doc123");
                Json(doc(&["Time: 07:15\n", "Morning run helped.\n"]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GoogleDocsClient::new("docs-token", &format!("http://{addr}/")).unwrap();
        let entry = convert_document(
            Some(&client),
            "https://docs.google.com/document/d/doc123/edit",
            NaiveDate::from_ymd_opt(2025, 1, 14),
            now(),
        )
        .await
        .unwrap();

        // No Date marker: the override applies
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
        assert_eq!(entry.time, NaiveTime::from_hms_opt(7, 15, 0));
        assert_eq!(entry.text, "Morning run helped.");
    }

    #[tokio::test]
    async fn test_document_without_time_defaults_to_midnight() {
        let app = Router::new().route(
            "/documents/:id",
            get(|| async { Json(doc(&["Date: 2025-01-10\n", "Quiet evening.\n"])) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GoogleDocsClient::new("t", &format!("http://{addr}")).unwrap();
        let entry = convert_document(Some(&client), "https://docs.google.com/document/d/x", None, now())
            .await
            .unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(entry.time, NaiveTime::from_hms_opt(0, 0, 0));
    }
}
