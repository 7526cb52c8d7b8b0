pub mod aggregator;
pub mod analyzer;
pub mod comparator;
pub mod ingest;
pub mod long_term;
pub mod oracle;
pub mod synthesizer;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::format_date;

/// Reject `start > end` before touching storage.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::Validation(format!(
            "start date {} is after end date {}",
            format_date(start),
            format_date(end)
        )));
    }
    Ok(())
}

/// Date stamped onto analyses.
pub fn today_stamp() -> String {
    format_date(chrono::Utc::now().date_naive())
}
