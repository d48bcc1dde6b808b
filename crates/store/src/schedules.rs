use std::collections::HashMap;

use model::{DayType, ScheduleEntry, StationSchedule};
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

#[derive(Debug, FromRow)]
struct EntryRow {
    direction_terminal_id: String,
    hour: i64,
    minute: i64,
}

/// Deletes then re-inserts every schedule's entries atomically per call
/// (spec §4.B).
pub async fn save_schedules(pool: &SqlitePool, schedules: &[StationSchedule]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for schedule in schedules {
        sqlx::query(
            "DELETE FROM schedules WHERE station_id = ? AND direction_terminal_id = ? AND day_type = ?",
        )
        .bind(&schedule.station_id)
        .bind(&schedule.direction_terminal_id)
        .bind(schedule.day_type.key())
        .execute(&mut *tx)
        .await?;

        for entry in &schedule.entries {
            sqlx::query(
                "INSERT INTO schedules (station_id, direction_terminal_id, day_type, hour, minute)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&schedule.station_id)
            .bind(&schedule.direction_terminal_id)
            .bind(schedule.day_type.key())
            .bind(entry.hour as i64)
            .bind(entry.minute as i64)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;
    Ok(())
}

/// Returns the ordered entries for one (station, direction, day_type), or
/// an empty vector if none are on file.
pub async fn get_schedule(
    pool: &SqlitePool,
    station_id: &str,
    direction_terminal_id: &str,
    day_type: DayType,
) -> Result<Vec<ScheduleEntry>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT hour, minute FROM schedules
         WHERE station_id = ? AND direction_terminal_id = ? AND day_type = ?
         ORDER BY hour ASC, minute ASC",
    )
    .bind(station_id)
    .bind(direction_terminal_id)
    .bind(day_type.key())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(h, m)| ScheduleEntry::new(h as u8, m as u8))
        .collect())
}

/// Entries with (hour, minute) >= `after`, ascending, capped at `limit`.
pub async fn get_next_departures(
    pool: &SqlitePool,
    station_id: &str,
    direction_terminal_id: &str,
    day_type: DayType,
    after: ScheduleEntry,
    limit: u32,
) -> Result<Vec<ScheduleEntry>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT hour, minute FROM schedules
         WHERE station_id = ? AND direction_terminal_id = ? AND day_type = ?
           AND (hour > ? OR (hour = ? AND minute >= ?))
         ORDER BY hour ASC, minute ASC
         LIMIT ?",
    )
    .bind(station_id)
    .bind(direction_terminal_id)
    .bind(day_type.key())
    .bind(after.hour as i64)
    .bind(after.hour as i64)
    .bind(after.minute as i64)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(h, m)| ScheduleEntry::new(h as u8, m as u8))
        .collect())
}

/// Symmetric to [`get_next_departures`]: entries with (hour, minute) <=
/// `before`, descending, capped at `limit`.
pub async fn get_previous_departures(
    pool: &SqlitePool,
    station_id: &str,
    direction_terminal_id: &str,
    day_type: DayType,
    before: ScheduleEntry,
    limit: u32,
) -> Result<Vec<ScheduleEntry>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT hour, minute FROM schedules
         WHERE station_id = ? AND direction_terminal_id = ? AND day_type = ?
           AND (hour < ? OR (hour = ? AND minute <= ?))
         ORDER BY hour DESC, minute DESC
         LIMIT ?",
    )
    .bind(station_id)
    .bind(direction_terminal_id)
    .bind(day_type.key())
    .bind(before.hour as i64)
    .bind(before.hour as i64)
    .bind(before.minute as i64)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(h, m)| ScheduleEntry::new(h as u8, m as u8))
        .collect())
}

/// One query that groups entries by direction for a station/day_type —
/// must not issue N sub-queries (spec §4.B).
pub async fn get_all_schedules_for_station(
    pool: &SqlitePool,
    station_id: &str,
    day_type: DayType,
) -> Result<Vec<StationSchedule>> {
    let rows: Vec<EntryRow> = sqlx::query_as(
        "SELECT direction_terminal_id, hour, minute FROM schedules
         WHERE station_id = ? AND day_type = ?
         ORDER BY direction_terminal_id, hour ASC, minute ASC",
    )
    .bind(station_id)
    .bind(day_type.key())
    .fetch_all(pool)
    .await?;

    let mut by_direction: HashMap<String, Vec<ScheduleEntry>> = HashMap::new();
    let mut direction_order = Vec::new();
    for row in rows {
        let entries = by_direction.entry(row.direction_terminal_id.clone()).or_insert_with(|| {
            direction_order.push(row.direction_terminal_id.clone());
            Vec::new()
        });
        entries.push(ScheduleEntry::new(row.hour as u8, row.minute as u8));
    }

    Ok(direction_order
        .into_iter()
        .map(|direction_terminal_id| {
            let entries = by_direction.remove(&direction_terminal_id).unwrap_or_default();
            StationSchedule {
                station_id: station_id.to_string(),
                direction_terminal_id,
                day_type,
                entries,
            }
        })
        .collect())
}

/// Earliest departure across the whole network for `day_type`.
pub async fn first_departure_time(
    pool: &SqlitePool,
    day_type: DayType,
) -> Result<Option<ScheduleEntry>> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT hour, minute FROM schedules WHERE day_type = ?
         ORDER BY hour ASC, minute ASC LIMIT 1",
    )
    .bind(day_type.key())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(h, m)| ScheduleEntry::new(h as u8, m as u8)))
}

/// Latest departure across the whole network for `day_type`.
pub async fn last_departure_time(
    pool: &SqlitePool,
    day_type: DayType,
) -> Result<Option<ScheduleEntry>> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT hour, minute FROM schedules WHERE day_type = ?
         ORDER BY hour DESC, minute DESC LIMIT 1",
    )
    .bind(day_type.key())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(h, m)| ScheduleEntry::new(h as u8, m as u8)))
}

/// `(open, last, first)` per spec §4.B. If the table is empty, `open` is
/// unconditionally true.
pub async fn is_metro_open(
    pool: &SqlitePool,
    day_type: DayType,
    t: ScheduleEntry,
    early_window_minutes: i64,
) -> Result<(bool, Option<ScheduleEntry>, Option<ScheduleEntry>)> {
    let first = first_departure_time(pool, day_type).await?;
    let last = last_departure_time(pool, day_type).await?;

    let (Some(first), Some(last)) = (first, last) else {
        return Ok((true, last, first));
    };

    let window_start = first.as_minutes() as i64 - early_window_minutes;
    let t_minutes = t.as_minutes() as i64;
    let open = window_start <= t_minutes && t_minutes <= last.as_minutes() as i64;

    Ok((open, Some(last), Some(first)))
}
