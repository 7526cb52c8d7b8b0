use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

/// Settings handed to the weekly analyzer and the trend synthesizer.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,

    pub llm: LlmSettings,

    pub google_docs_access_token: Option<String>,
    pub google_docs_api_url: String,

    pub analysis_rate_limit: u32,
    pub analysis_rate_window_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 5050)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            llm: LlmSettings {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
                temperature: parse_var("LLM_TEMPERATURE", 0.3)?,
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", 60)?,
            },

            google_docs_access_token: env::var("GOOGLE_DOCS_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            google_docs_api_url: env::var("GOOGLE_DOCS_API_URL")
                .unwrap_or_else(|_| "https://docs.googleapis.com/v1".into()),

            analysis_rate_limit: parse_var("ANALYSIS_RATE_LIMIT", 10)?,
            analysis_rate_window_secs: parse_var("ANALYSIS_RATE_WINDOW_SECS", 60)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_data_dir() -> PathBuf {
    // Container deployments mount the data volume here
    let container = Path::new("/app/data");
    if container.is_dir() {
        container.to_path_buf()
    } else {
        PathBuf::from("./data")
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            cors_extra_origins: Vec::new(),
            llm: LlmSettings {
                api_key: String::new(),
                model: "test-model".into(),
                base_url: "http://127.0.0.1:9".into(),
                temperature: 0.3,
                timeout_secs: 1,
            },
            google_docs_access_token: None,
            google_docs_api_url: "http://127.0.0.1:9".into(),
            analysis_rate_limit: 100,
            analysis_rate_window_secs: 60,
        }
    }
}
