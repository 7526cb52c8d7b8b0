use axum::{extract::State, Json};
use chrono::Local;
use validator::Validate;

use crate::dto::{
    AggregateResponse, AggregationInfo, PipelineRequest, PipelineResponse, WeekInsight,
    WeekInsightResponse, WeekRangeRequest,
};
use crate::error::{AppError, AppResult};
use crate::models::analysis::{AnalysisOutcome, WeeklyAnalysis};
use crate::models::packet::WeeklyPacket;
use crate::services::{aggregator, ingest::convert_document, validate_range};
use crate::storage::keys::{daily_entry_key, summary_key, weekly_packet_key};
use crate::storage::{blocking, get_json, put_json};
use crate::AppState;

pub async fn aggregate_week(
    State(state): State<AppState>,
    Json(body): Json<WeekRangeRequest>,
) -> AppResult<Json<AggregateResponse>> {
    body.validate()?;
    validate_range(body.week_start, body.week_end)?;

    let _guard = state.locks.acquire(&body.patient_id).await;
    let patients = state.patients.clone();
    let (patient_id, start, end) = (body.patient_id.clone(), body.week_start, body.week_end);
    let packet = blocking(move || {
        let store = patients.open_or_create(&patient_id)?;
        aggregator::aggregate_week(&store, &patient_id, start, end)
    })
    .await?;

    Ok(Json(AggregateResponse {
        success: true,
        message: "Weekly entries aggregated",
        entry_count: packet.entry_count(),
        missing_days: packet.missing_days.len(),
        file: weekly_packet_key(body.week_start, body.week_end),
        weekly_data: packet,
    }))
}

/// Analyze a previously aggregated week. The summary is stored only when the
/// analysis completed; failures come back as data.
pub async fn analyze_week(
    State(state): State<AppState>,
    Json(body): Json<WeekRangeRequest>,
) -> AppResult<Json<WeekInsightResponse>> {
    body.validate()?;
    validate_range(body.week_start, body.week_end)?;

    let patients = state.patients.clone();
    let patient_id = body.patient_id.clone();
    let key = weekly_packet_key(body.week_start, body.week_end);
    let packet: WeeklyPacket = blocking(move || {
        let store = patients.open_or_create(&patient_id)?;
        get_json(&store, &key)?
            .ok_or_else(|| AppError::NotFound(format!("Weekly file not found: {}", key)))
    })
    .await?;

    let outcome = state.analyzer.analyze(&packet).await;
    let response = store_analysis(&state, &body.patient_id, &packet, outcome).await?;
    Ok(Json(response))
}

/// Ingest every document, aggregate the week and analyze it in one call.
pub async fn process_full_pipeline(
    State(state): State<AppState>,
    Json(body): Json<PipelineRequest>,
) -> AppResult<Json<PipelineResponse>> {
    body.validate()?;
    validate_range(body.week_start, body.week_end)?;

    let now = Local::now().naive_local();
    let mut converted_entries = Vec::with_capacity(body.doc_urls.len());
    for source in &body.doc_urls {
        let entry = convert_document(state.docs.as_deref(), &source.url, source.date, now).await?;
        converted_entries.push(entry);
    }

    let packet = {
        let _guard = state.locks.acquire(&body.patient_id).await;
        let patients = state.patients.clone();
        let patient_id = body.patient_id.clone();
        let entries = converted_entries.clone();
        let (start, end) = (body.week_start, body.week_end);
        blocking(move || {
            let store = patients.open_or_create(&patient_id)?;
            for entry in &entries {
                put_json(&store, &daily_entry_key(entry.date), entry)?;
            }
            aggregator::aggregate_week(&store, &patient_id, start, end)
        })
        .await?
    };

    tracing::info!(
        patient_id = %body.patient_id,
        converted = converted_entries.len(),
        entry_count = packet.entry_count(),
        "Pipeline ingested and aggregated"
    );

    let outcome = state.analyzer.analyze(&packet).await;
    let result = store_analysis(&state, &body.patient_id, &packet, outcome).await?;

    Ok(Json(PipelineResponse {
        result,
        converted_entries,
        aggregation: AggregationInfo {
            entry_count: packet.entry_count(),
            file: weekly_packet_key(body.week_start, body.week_end),
        },
    }))
}

async fn store_analysis(
    state: &AppState,
    patient_id: &str,
    packet: &WeeklyPacket,
    outcome: AnalysisOutcome<WeeklyAnalysis>,
) -> AppResult<WeekInsightResponse> {
    match outcome {
        AnalysisOutcome::Completed(analysis) => {
            let insight = WeekInsight::from_analysis(&analysis, packet);
            let _guard = state.locks.acquire(patient_id).await;
            let patients = state.patients.clone();
            let patient_id = patient_id.to_string();
            let key = summary_key(packet.week_start, packet.week_end);
            blocking(move || {
                let store = patients.open_or_create(&patient_id)?;
                put_json(&store, &key, &analysis)
            })
            .await?;
            Ok(AnalysisOutcome::Completed(insight))
        }
        AnalysisOutcome::Failed(failure) => {
            tracing::warn!(
                patient_id = %patient_id,
                week_period = %packet.week_period(),
                reason = %failure.error,
                "Weekly analysis not stored"
            );
            Ok(AnalysisOutcome::Failed(failure))
        }
    }
}
