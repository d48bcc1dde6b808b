use std::collections::HashMap;

use chrono::{DateTime, Utc};
use model::{SessionKey, SessionKeyDto, SessionRecord};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

#[derive(Debug, FromRow)]
struct SessionRow {
    chat_id: i64,
    user_id: i64,
    destiny_tag: String,
    state: Option<String>,
    data: String,
    updated_at: String,
}

impl SessionRow {
    fn into_record(self) -> Result<SessionRecord> {
        let data: HashMap<String, Value> = serde_json::from_str(&self.data)?;
        let updated_at: DateTime<Utc> = self
            .updated_at
            .parse()
            .unwrap_or_else(|_| Utc::now());
        Ok(SessionRecord {
            key: SessionKeyDto {
                chat_id: self.chat_id,
                user_id: self.user_id,
                destiny_tag: self.destiny_tag,
            },
            state: self.state,
            data,
            updated_at,
        })
    }
}

async fn load(pool: &SqlitePool, key: &SessionKey) -> Result<Option<SessionRow>> {
    let row: Option<SessionRow> = sqlx::query_as(
        "SELECT chat_id, user_id, destiny_tag, state, data, updated_at
         FROM sessions WHERE chat_id = ? AND user_id = ? AND destiny_tag = ?",
    )
    .bind(key.chat_id)
    .bind(key.user_id)
    .bind(&key.destiny_tag)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn upsert(
    pool: &SqlitePool,
    key: &SessionKey,
    state: Option<&str>,
    data: &str,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO sessions (chat_id, user_id, destiny_tag, state, data, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(chat_id, user_id, destiny_tag) DO UPDATE SET
            state = excluded.state,
            data = excluded.data,
            updated_at = excluded.updated_at",
    )
    .bind(key.chat_id)
    .bind(key.user_id)
    .bind(&key.destiny_tag)
    .bind(state)
    .bind(data)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_state(pool: &SqlitePool, key: &SessionKey) -> Result<Option<String>> {
    Ok(load(pool, key).await?.and_then(|row| row.state))
}

/// Sets the state, preserving existing data (spec §4.E).
pub async fn set_state(pool: &SqlitePool, key: &SessionKey, state: Option<&str>) -> Result<()> {
    let existing = load(pool, key).await?;
    let data = existing.map(|r| r.data).unwrap_or_else(|| "{}".to_string());
    upsert(pool, key, state, &data).await
}

pub async fn get_data(pool: &SqlitePool, key: &SessionKey) -> Result<HashMap<String, Value>> {
    match load(pool, key).await? {
        Some(row) => Ok(row.into_record()?.data),
        None => Ok(HashMap::new()),
    }
}

/// Replaces the data map, preserving existing state (spec §4.E).
pub async fn set_data(pool: &SqlitePool, key: &SessionKey, data: &HashMap<String, Value>) -> Result<()> {
    let existing = load(pool, key).await?;
    let state = existing.and_then(|r| r.state);
    let encoded = serde_json::to_string(data)?;
    upsert(pool, key, state.as_deref(), &encoded).await
}

/// Read-merge-write in one logical step: `patch` entries overwrite
/// same-keyed existing entries, the rest of the map is untouched.
pub async fn update_data(
    pool: &SqlitePool,
    key: &SessionKey,
    patch: HashMap<String, Value>,
) -> Result<()> {
    let existing = load(pool, key).await?;
    let state = existing.as_ref().and_then(|r| r.state.clone());
    let mut data = match existing {
        Some(row) => row.into_record()?.data,
        None => HashMap::new(),
    };
    data.extend(patch);
    let encoded = serde_json::to_string(&data)?;
    upsert(pool, key, state.as_deref(), &encoded).await
}

pub async fn clear(pool: &SqlitePool, key: &SessionKey) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE chat_id = ? AND user_id = ? AND destiny_tag = ?")
        .bind(key.chat_id)
        .bind(key.user_id)
        .bind(&key.destiny_tag)
        .execute(pool)
        .await?;
    Ok(())
}

/// Removes rows whose `updated_at` is older than `max_age` and returns the
/// count removed.
pub async fn cleanup_stale(pool: &SqlitePool, max_age: chrono::Duration) -> Result<u64> {
    let cutoff = (Utc::now() - max_age).to_rfc3339();
    let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
