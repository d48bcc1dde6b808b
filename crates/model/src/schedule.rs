use std::cmp::Ordering;

use chrono::Datelike;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weekday vs weekend timetable variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Derives the day type from a calendar date: weekend iff the ISO
    /// weekday is Saturday or Sunday (weekday index >= 5, Monday = 0).
    pub fn for_date(date: impl Datelike) -> DayType {
        if date.weekday().num_days_from_monday() >= 5 {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
        }
    }

    pub fn from_key(key: &str) -> Option<DayType> {
        match key {
            "weekday" => Some(DayType::Weekday),
            "weekend" => Some(DayType::Weekend),
            _ => None,
        }
    }
}

/// A clock-time departure entry, treated as wall-clock time on a conceptual
/// 24-hour cycle. Ordered and compared lexicographically on `(hour, minute)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleEntry {
    pub hour: u8,
    pub minute: u8,
}

impl ScheduleEntry {
    pub fn new(hour: u8, minute: u8) -> Self {
        debug_assert!(hour <= 23);
        debug_assert!(minute <= 59);
        Self { hour, minute }
    }

    pub fn as_minutes(self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }
}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.hour, self.minute).cmp(&(other.hour, other.minute))
    }
}

/// Display metadata for one day type, loaded from `day_types.<key>` in the
/// bundled data file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayTypeMeta {
    pub day_type: DayType,
    pub emoji: String,
    pub name: crate::line::LocalizedText,
}

/// Departures at one station, in one direction, for one day type. `entries`
/// is ordered ascending by `(hour, minute)` and deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StationSchedule {
    pub station_id: String,
    pub direction_terminal_id: String,
    pub day_type: DayType,
    pub entries: Vec<ScheduleEntry>,
}

impl StationSchedule {
    /// Sorts and deduplicates `entries` in place, as required by the
    /// invariant in spec §3.
    pub fn normalize(&mut self) {
        self.entries.sort();
        self.entries.dedup();
    }
}
