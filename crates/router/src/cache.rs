use std::collections::HashMap;

use model::{DayType, ScheduleEntry};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    station_id: String,
    direction_terminal_id: String,
    day_type: DayType,
    hour: u8,
    minute: u8,
    limit: u32,
}

/// A concurrent read-mostly memo on (station, direction, day_type, hour,
/// minute, limit), separately for next- and previous-departure lookups
/// (spec §9: "ad-hoc schedule caches on the router"). Safe because the
/// underlying timetable is only mutated by the scrape command, which
/// requires a process restart anyway.
#[derive(Debug, Default)]
pub struct ScheduleMemo {
    next: RwLock<HashMap<CacheKey, Vec<ScheduleEntry>>>,
    previous: RwLock<HashMap<CacheKey, Vec<ScheduleEntry>>>,
}

impl ScheduleMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_next_or_insert_with<F, Fut>(
        &self,
        station_id: &str,
        direction_terminal_id: &str,
        day_type: DayType,
        after: ScheduleEntry,
        limit: u32,
        compute: F,
    ) -> crate::error::RouterResult<Vec<ScheduleEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::error::RouterResult<Vec<ScheduleEntry>>>,
    {
        let key = CacheKey {
            station_id: station_id.to_string(),
            direction_terminal_id: direction_terminal_id.to_string(),
            day_type,
            hour: after.hour,
            minute: after.minute,
            limit,
        };
        if let Some(hit) = self.next.read().await.get(&key) {
            return Ok(hit.clone());
        }
        let value = compute().await?;
        self.next.write().await.insert(key, value.clone());
        Ok(value)
    }

    pub async fn get_previous_or_insert_with<F, Fut>(
        &self,
        station_id: &str,
        direction_terminal_id: &str,
        day_type: DayType,
        before: ScheduleEntry,
        limit: u32,
        compute: F,
    ) -> crate::error::RouterResult<Vec<ScheduleEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::error::RouterResult<Vec<ScheduleEntry>>>,
    {
        let key = CacheKey {
            station_id: station_id.to_string(),
            direction_terminal_id: direction_terminal_id.to_string(),
            day_type,
            hour: before.hour,
            minute: before.minute,
            limit,
        };
        if let Some(hit) = self.previous.read().await.get(&key) {
            return Ok(hit.clone());
        }
        let value = compute().await?;
        self.previous.write().await.insert(key, value.clone());
        Ok(value)
    }
}
