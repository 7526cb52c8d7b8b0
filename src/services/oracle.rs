use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::LlmSettings;

/// One prompt sent to the language model.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub system_instruction: &'a str,
    pub user_prompt: &'a str,
    pub model: &'a str,
    pub temperature: f64,
    pub response_is_json: bool,
}

/// The external language model: prompt in, raw response text out.
#[async_trait]
pub trait LlmOracle: Send + Sync {
    async fn complete(&self, request: OracleRequest<'_>) -> anyhow::Result<String>;
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiOracle {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiOracle {
    pub fn new(settings: &LlmSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("build LLM HTTP client")?;
        Ok(Self {
            http,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Chat completions payload. Model and temperature go out exactly as configured.
fn chat_request_body(request: &OracleRequest<'_>) -> Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": [
            {"role": "system", "content": request.system_instruction},
            {"role": "user", "content": request.user_prompt}
        ],
        "temperature": request.temperature,
    });
    if request.response_is_json {
        body["response_format"] = serde_json::json!({"type": "json_object"});
    }
    body
}

#[async_trait]
impl LlmOracle for OpenAiOracle {
    async fn complete(&self, request: OracleRequest<'_>) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY not configured");
        }

        let body = chat_request_body(&request);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("LLM call failed {}: {}", status, text);
        }

        let json: Value = response
            .json()
            .await
            .context("decode chat completion response")?;
        json.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("chat completion response had no message content"))
    }
}
