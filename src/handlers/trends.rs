use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::dto::{CompareResponse, ComparePeriodsRequest, LongTermRequest, LongTermResponse};
use crate::error::AppResult;
use crate::services::{comparator, synthesizer, validate_range};
use crate::storage::keys::{comparison_key, long_term_key};
use crate::storage::blob::BlobStore;
use crate::storage::{blocking, put_json};
use crate::AppState;

/// Long-term trends over every weekly analysis starting inside the window.
pub async fn analyze_long_term(
    State(state): State<AppState>,
    Json(body): Json<LongTermRequest>,
) -> AppResult<Json<LongTermResponse>> {
    body.validate()?;
    validate_range(body.start_date, body.end_date)?;

    let store = open_store(&state, &body.patient_id).await?;
    let analysis = synthesizer::analyze_long_term_trends(
        store.clone(),
        &state.synthesizer,
        body.start_date,
        body.end_date,
    )
    .await?;

    let file = if analysis.is_failed() {
        None
    } else {
        let key = long_term_key(body.start_date, body.end_date);
        let _guard = state.locks.acquire(&body.patient_id).await;
        let (target, stored) = (key.clone(), analysis.clone());
        blocking(move || put_json(store.as_ref(), &target, &stored)).await?;
        Some(key)
    };

    Ok(Json(LongTermResponse {
        success: !analysis.is_failed(),
        analysis,
        file,
    }))
}

pub async fn compare_periods(
    State(state): State<AppState>,
    Json(body): Json<ComparePeriodsRequest>,
) -> AppResult<Json<CompareResponse>> {
    body.validate()?;
    validate_range(body.period1.start, body.period1.end)?;
    validate_range(body.period2.start, body.period2.end)?;

    let store = open_store(&state, &body.patient_id).await?;
    let comparison = comparator::compare_periods(
        store.clone(),
        &state.synthesizer,
        body.period1.start,
        body.period1.end,
        body.period2.start,
        body.period2.end,
    )
    .await?;

    let both_completed =
        !comparison.period_1.analysis.is_failed() && !comparison.period_2.analysis.is_failed();
    let file = if both_completed {
        let key = comparison_key(body.period1.start, body.period2.start);
        let _guard = state.locks.acquire(&body.patient_id).await;
        let (target, stored) = (key.clone(), comparison.clone());
        blocking(move || put_json(store.as_ref(), &target, &stored)).await?;
        Some(key)
    } else {
        None
    };

    Ok(Json(CompareResponse {
        success: true,
        comparison,
        file,
    }))
}

/// Existing patients only; reads never create a directory.
async fn open_store(state: &AppState, patient_id: &str) -> AppResult<Arc<dyn BlobStore>> {
    let patients = state.patients.clone();
    let patient_id = patient_id.to_string();
    let store = blocking(move || patients.open(&patient_id)).await?;
    Ok(Arc::new(store))
}
