use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::AppError;
use crate::AppState;

/// Requests seen from one client since `opened`.
#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    used: u32,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self { opened: now, used: 0 }
    }

    /// Spend one request. `Ok(remaining)`, or `Err(wait)` until the window
    /// rolls over. A window older than `span` restarts at `now`.
    fn hit(&mut self, now: Instant, limit: u32, span: Duration) -> Result<u32, Duration> {
        let age = now.saturating_duration_since(self.opened);
        if age > span {
            *self = Self::open(now);
        }
        if self.used >= limit {
            return Err(span.saturating_sub(now.saturating_duration_since(self.opened)));
        }
        self.used += 1;
        Ok(limit - self.used)
    }

    fn is_stale(&self, now: Instant, keep_for: Duration) -> bool {
        now.saturating_duration_since(self.opened) >= keep_for
    }
}

/// Fixed-window request budget per client, held in memory for a single
/// instance.
#[derive(Clone)]
pub struct AnalysisLimiter {
    limit: u32,
    span: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl AnalysisLimiter {
    pub fn new(limit: u32, span: Duration) -> Self {
        Self {
            limit,
            span,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.analysis_rate_limit,
            Duration::from_secs(config.analysis_rate_window_secs),
        )
    }

    pub async fn check(&self, client: &str) -> Result<u32, Duration> {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: &str, now: Instant) -> Result<u32, Duration> {
        let mut windows = self.windows.lock().await;
        windows
            .entry(client.to_string())
            .or_insert_with(|| Window::open(now))
            .hit(now, self.limit, self.span)
    }

    /// Forget clients idle for two full windows.
    pub async fn sweep(&self) {
        self.sweep_at(Instant::now()).await;
    }

    async fn sweep_at(&self, now: Instant) {
        let keep_for = self.span * 2;
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| !window.is_stale(now, keep_for));
        let dropped = before - windows.len();
        if dropped > 0 {
            tracing::debug!(dropped, tracked = windows.len(), "Rate limit windows swept");
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// Budget shared by every model-backed route, keyed by client IP.
pub async fn rate_limit_analysis(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = format!("analysis:{}", addr.ip());

    match state.rate_limiter.check(&client).await {
        Ok(remaining) => {
            tracing::debug!(client = %client, path = %req.uri().path(), remaining, "Analysis request admitted");
            Ok(next.run(req).await)
        }
        Err(wait) => {
            tracing::warn!(
                client = %client,
                path = %req.uri().path(),
                retry_after_secs = wait.as_secs(),
                "Analysis rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}
