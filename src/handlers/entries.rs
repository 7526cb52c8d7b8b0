use axum::{extract::State, Json};
use chrono::Local;
use validator::Validate;

use crate::dto::{CreateEntryRequest, EntryResponse};
use crate::error::AppResult;
use crate::services::ingest::convert_document;
use crate::storage::keys::daily_entry_key;
use crate::storage::{blocking, put_json};
use crate::AppState;

/// Convert a Google Doc (or pasted text) and store it as that day's entry.
/// An existing entry for the same date is replaced.
pub async fn create_entry(
    State(state): State<AppState>,
    Json(body): Json<CreateEntryRequest>,
) -> AppResult<Json<EntryResponse>> {
    body.validate()?;

    let now = Local::now().naive_local();
    let entry = convert_document(state.docs.as_deref(), &body.doc_url, body.date, now).await?;

    let file = daily_entry_key(entry.date);
    let _guard = state.locks.acquire(&body.patient_id).await;
    let patients = state.patients.clone();
    let (patient_id, key, stored) = (body.patient_id.clone(), file.clone(), entry.clone());
    blocking(move || {
        let store = patients.open_or_create(&patient_id)?;
        put_json(&store, &key, &stored)
    })
    .await?;

    tracing::info!(patient_id = %body.patient_id, key = %file, "Journal entry stored");
    Ok(Json(EntryResponse {
        success: true,
        message: "Entry converted and saved",
        entry,
        file,
    }))
}
