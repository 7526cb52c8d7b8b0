use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::{AnalysesResponse, PatientListResponse, PatientSummary, WeekBounds, WeeklyAnalysisView};
use crate::error::{AppError, AppResult};
use crate::models::analysis::WeeklyAnalysis;
use crate::storage::blob::BlobStore;
use crate::storage::blocking;
use crate::storage::keys::{parse_daily_entry_key, parse_summary_key, JSON_SUFFIX, SUMMARY_PREFIX};
use crate::storage::patients::PatientRegistry;
use crate::AppState;

/// Registry patients that have a data directory, with entry counts and the
/// most recent analyzed week.
pub async fn list_patients(State(state): State<AppState>) -> AppResult<Json<PatientListResponse>> {
    let registry = state.patients.clone();
    let patients = blocking(move || summarize_patients(&registry)).await?;
    Ok(Json(PatientListResponse { patients }))
}

fn summarize_patients(registry: &PatientRegistry) -> AppResult<Vec<PatientSummary>> {
    let mut patients = Vec::new();

    for patient in registry.load()? {
        let store = match registry.open(&patient.id) {
            Ok(store) => store,
            Err(AppError::NotFound(_)) | Err(AppError::Validation(_)) => continue,
            Err(e) => return Err(e),
        };

        let entry_count = store
            .list_keys("")?
            .iter()
            .filter(|key| parse_daily_entry_key(key).is_some())
            .count();

        let mut summaries: Vec<String> = store
            .list_keys(SUMMARY_PREFIX)?
            .into_iter()
            .filter(|key| key.ends_with(JSON_SUFFIX))
            .collect();
        summaries.sort_unstable_by(|a, b| b.cmp(a));
        let latest_week = summaries
            .first()
            .and_then(|key| parse_summary_key(key))
            .map(|(start, end)| WeekBounds {
                start: start.to_string(),
                end: end.to_string(),
            });

        patients.push(PatientSummary {
            name: patient.display_name().to_string(),
            patient_id: patient.id,
            therapist: patient.therapist,
            entry_count,
            latest_week,
        });
    }

    Ok(patients)
}

/// Stored weekly analyses for one patient, newest week first.
pub async fn get_patient_analyses(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> AppResult<Json<AnalysesResponse>> {
    let registry = state.patients.clone();
    let analyses = blocking(move || stored_analyses(&registry, &patient_id)).await?;
    Ok(Json(AnalysesResponse { analyses }))
}

fn stored_analyses(registry: &PatientRegistry, patient_id: &str) -> AppResult<Vec<WeeklyAnalysisView>> {
    let store = registry.open(patient_id)?;

    let mut analyses = Vec::new();
    for key in store.list_keys(SUMMARY_PREFIX)? {
        if !key.ends_with(JSON_SUFFIX) {
            continue;
        }
        let Some(bytes) = store.get(&key)? else {
            continue;
        };
        match serde_json::from_slice::<WeeklyAnalysis>(&bytes) {
            Ok(analysis) => analyses.push(WeeklyAnalysisView::build(&analysis, patient_id, &key)),
            Err(e) => {
                tracing::warn!(patient_id = %patient_id, key = %key, reason = %e, "Skipping unreadable weekly summary");
            }
        }
    }

    analyses.sort_by(|a, b| b.week_start.cmp(&a.week_start));
    Ok(analyses)
}
