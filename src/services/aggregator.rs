use chrono::NaiveDate;

use super::validate_range;
use crate::error::{AppError, AppResult};
use crate::models::entry::JournalEntry;
use crate::models::format_period;
use crate::models::packet::WeeklyPacket;
use crate::storage::blob::BlobStore;
use crate::storage::keys::{daily_entry_key, weekly_packet_key};
use crate::storage::put_json;

/// Collect every daily entry in `[week_start, week_end]` into a packet and
/// store it as `week_<start>_to_<end>.json`.
///
/// Each day lands in exactly one of `entries` or `missing_days`. A range with
/// no entries at all is `NotFound` and nothing is written.
pub fn aggregate_week(
    store: &dyn BlobStore,
    patient_id: &str,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> AppResult<WeeklyPacket> {
    validate_range(week_start, week_end)?;

    let mut entries = Vec::new();
    let mut missing_days = Vec::new();

    for date in week_start.iter_days().take_while(|d| *d <= week_end) {
        let key = daily_entry_key(date);
        let Some(bytes) = store.get(&key)? else {
            missing_days.push(date);
            continue;
        };
        match serde_json::from_slice::<JournalEntry>(&bytes) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    patient_id = %patient_id,
                    key = %key,
                    reason = %e,
                    "Unreadable daily entry, counting the day as missing"
                );
                missing_days.push(date);
            }
        }
    }

    if entries.is_empty() {
        return Err(AppError::NotFound(format!(
            "No journal entries found for {}",
            format_period(week_start, week_end)
        )));
    }

    let packet = WeeklyPacket {
        patient_id: patient_id.to_string(),
        week_start,
        week_end,
        entries,
        missing_days,
    };
    put_json(store, &weekly_packet_key(week_start, week_end), &packet)?;

    tracing::info!(
        patient_id = %patient_id,
        week_period = %packet.week_period(),
        entry_count = packet.entry_count(),
        missing = packet.missing_days.len(),
        "Weekly packet aggregated"
    );
    Ok(packet)
}
