//! Blob key layout. These names are the on-disk format and must not change.

use chrono::NaiveDate;

use crate::models::{format_date, DATE_FORMAT};

pub const JSON_SUFFIX: &str = ".json";
pub const WEEK_PREFIX: &str = "week_";
pub const SUMMARY_PREFIX: &str = "summary_";

/// `<YYYY-MM-DD>.json`
pub fn daily_entry_key(date: NaiveDate) -> String {
    format!("{}{}", format_date(date), JSON_SUFFIX)
}

/// `week_<start>_to_<end>.json`
pub fn weekly_packet_key(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}{}_to_{}{}",
        WEEK_PREFIX,
        format_date(start),
        format_date(end),
        JSON_SUFFIX
    )
}

/// `summary_<start>_to_<end>.json`
pub fn summary_key(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}{}_to_{}{}",
        SUMMARY_PREFIX,
        format_date(start),
        format_date(end),
        JSON_SUFFIX
    )
}

pub fn long_term_key(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "long_term_analysis_{}_to_{}{}",
        format_date(start),
        format_date(end),
        JSON_SUFFIX
    )
}

pub fn comparison_key(period1_start: NaiveDate, period2_start: NaiveDate) -> String {
    format!(
        "comparison_{}_vs_{}{}",
        format_date(period1_start),
        format_date(period2_start),
        JSON_SUFFIX
    )
}

/// Split a summary key back into its raw `(start, end)` strings.
pub fn parse_summary_key(key: &str) -> Option<(&str, &str)> {
    let range = key
        .strip_prefix(SUMMARY_PREFIX)?
        .strip_suffix(JSON_SUFFIX)?;
    range.split_once("_to_")
}

pub fn parse_daily_entry_key(key: &str) -> Option<NaiveDate> {
    let stem = key.strip_suffix(JSON_SUFFIX)?;
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}
