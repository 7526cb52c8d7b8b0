pub mod analysis;
pub mod entry;
pub mod packet;
pub mod patient;
pub mod trends;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Calendar dates are always rendered zero-padded so that lexicographic
/// order of keys and periods matches chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `"<start> to <end>"`
pub fn format_period(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} to {}", format_date(start), format_date(end))
}

/// Deserialize a field of a read view, falling back to the default when the
/// value has an unexpected shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// String field of a model record.
pub(crate) fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Typed reading of one field; a wrong shape reads as absent.
pub(crate) fn read_field<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Option<T> {
    record.get(key).and_then(|value| T::deserialize(value).ok())
}

/// Elements of an array field that fit `T`. The others are skipped, never
/// the whole list.
pub(crate) fn read_list<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Vec<T> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| T::deserialize(item).ok()).collect())
        .unwrap_or_default()
}
