use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod dto;
mod error;
mod handlers;
mod models;
mod services;
mod storage;

use auth::rate_limit::AnalysisLimiter;
use config::Config;
use services::analyzer::WeeklyAnalyzer;
use services::ingest::GoogleDocsClient;
use services::oracle::{LlmOracle, OpenAiOracle};
use services::synthesizer::TrendSynthesizer;
use storage::locks::PatientLocks;
use storage::patients::PatientRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub patients: PatientRegistry,
    pub analyzer: Arc<WeeklyAnalyzer>,
    pub synthesizer: Arc<TrendSynthesizer>,
    pub docs: Option<Arc<GoogleDocsClient>>,
    pub rate_limiter: AnalysisLimiter,
    pub locks: PatientLocks,
}

impl AppState {
    pub fn new(config: Config, oracle: Arc<dyn LlmOracle>) -> anyhow::Result<Self> {
        let docs = match &config.google_docs_access_token {
            Some(token) => Some(Arc::new(GoogleDocsClient::new(
                token.clone(),
                &config.google_docs_api_url,
            )?)),
            None => None,
        };

        Ok(Self {
            patients: PatientRegistry::new(config.data_dir.clone()),
            analyzer: Arc::new(WeeklyAnalyzer::new(oracle.clone(), config.llm.clone())),
            synthesizer: Arc::new(TrendSynthesizer::new(oracle, config.llm.clone())),
            docs,
            rate_limiter: AnalysisLimiter::from_config(&config),
            locks: PatientLocks::new(),
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_insights_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("create data directory {}", config.data_dir.display()))?;

    if config.llm.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY not set; analyses will report failures");
    }
    if config.google_docs_access_token.is_none() {
        tracing::info!("GOOGLE_DOCS_ACCESS_TOKEN not set; only plain-text entries are accepted");
    }

    let oracle: Arc<dyn LlmOracle> = Arc::new(OpenAiOracle::new(&config.llm)?);
    let state = AppState::new(config, oracle)?;

    spawn_rate_limit_sweep(state.rate_limiter.clone());

    let addr = state.config.listen_addr();
    tracing::info!(
        data_dir = %state.config.data_dir.display(),
        model = %state.config.llm.model,
        "Starting server on {}",
        addr
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    // Client IP is needed for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    // Routes that call the language model
    let analysis_routes = Router::new()
        .route("/api/analyze-week", post(handlers::weeks::analyze_week))
        .route(
            "/api/process-full-pipeline",
            post(handlers::weeks::process_full_pipeline),
        )
        .route(
            "/api/analyze-long-term",
            post(handlers::trends::analyze_long_term),
        )
        .route("/api/compare-periods", post(handlers::trends::compare_periods))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_analysis,
        ));

    let storage_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/entries", post(handlers::entries::create_entry))
        .route("/api/aggregate-week", post(handlers::weeks::aggregate_week))
        .route("/api/patients", get(handlers::patients::list_patients))
        .route(
            "/api/patients/:patient_id/analyses",
            get(handlers::patients::get_patient_analyses),
        );

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(storage_routes)
        .merge(analysis_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<axum::http::HeaderValue> =
        std::iter::once(config.frontend_url.as_str())
            .chain(config.cors_extra_origins.iter().map(String::as_str))
            .filter_map(|origin| match origin.parse::<axum::http::HeaderValue>() {
                Ok(hv) => Some(hv),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

/// Purge stale rate limit windows every 5 min
fn spawn_rate_limit_sweep(limiter: AnalysisLimiter) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.sweep().await;
        }
    });
}
