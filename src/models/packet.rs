use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entry::JournalEntry;
use super::format_period;

/// A week of entries plus the days that had nothing on file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyPacket {
    pub patient_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Vec<JournalEntry>,
    #[serde(default)]
    pub missing_days: Vec<NaiveDate>,
}

impl WeeklyPacket {
    pub fn week_period(&self) -> String {
        format_period(self.week_start, self.week_end)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
