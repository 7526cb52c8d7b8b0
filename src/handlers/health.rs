use axum::Json;

use crate::dto::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "journal-insights-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
