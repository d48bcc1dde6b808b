use chrono::{DateTime, Utc};
use model::{Lang, Reminder};
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

#[derive(Debug, FromRow)]
struct ReminderRow {
    id: i64,
    user_id: i64,
    route_fingerprint: String,
    station_id: String,
    remind_at: String,
    lang: String,
    active: i64,
    created_at: String,
}

impl ReminderRow {
    fn into_model(self) -> Reminder {
        Reminder {
            id: self.id,
            user_id: self.user_id,
            route_fingerprint: self.route_fingerprint,
            station_id: self.station_id,
            remind_at: self.remind_at.parse().unwrap_or_else(|_| Utc::now()),
            lang: Lang::from_code(&self.lang).unwrap_or_default(),
            active: self.active != 0,
            created_at: self.created_at.parse().unwrap_or_else(|_| Utc::now()),
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, route_fingerprint, station_id, remind_at, lang, active, created_at";

/// Persists a new active reminder and returns its row id.
pub async fn insert(
    pool: &SqlitePool,
    user_id: i64,
    route_fingerprint: &str,
    station_id: &str,
    remind_at: DateTime<Utc>,
    lang: Lang,
) -> Result<i64> {
    let lang_key = match lang {
        Lang::Ua => "ua",
        Lang::En => "en",
    };
    let result = sqlx::query(
        "INSERT INTO reminders (user_id, route_fingerprint, station_id, remind_at, lang, active, created_at)
         VALUES (?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(user_id)
    .bind(route_fingerprint)
    .bind(station_id)
    .bind(remind_at.to_rfc3339())
    .bind(lang_key)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn deactivate(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE reminders SET active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Used by `cancel(user_id)`: deactivates every active reminder for the
/// user (at most one by contract) and returns the affected rows so the
/// scheduler can cancel their in-memory timers.
pub async fn deactivate_active_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Reminder>> {
    let active = get_active_for_user(pool, user_id).await?;
    sqlx::query("UPDATE reminders SET active = 0 WHERE user_id = ? AND active = 1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(active)
}

pub async fn get_active_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Reminder>> {
    let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM reminders WHERE user_id = ? AND active = 1"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ReminderRow::into_model).collect())
}

/// All active reminders, for the startup `restore` pass.
pub async fn get_all_active(pool: &SqlitePool) -> Result<Vec<Reminder>> {
    let rows: Vec<ReminderRow> =
        sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM reminders WHERE active = 1"))
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(ReminderRow::into_model).collect())
}

/// Deactivates every active reminder whose `remind_at` is at or before
/// `now`, for the hourly housekeeping sweep. Returns how many were swept.
pub async fn deactivate_overdue(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("UPDATE reminders SET active = 0 WHERE active = 1 AND remind_at <= ?")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
