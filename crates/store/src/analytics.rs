use chrono::{DateTime, Utc};
use model::{UsageEvent, UserUsage};
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

/// Records one opt-in usage event (spec.md §3: "aggregated into (user_id,
/// first_seen, last_seen, interaction_count) and per-feature counters").
/// `event.user_id` is already a salted hash by the time it reaches here;
/// `UsageEvent` itself is never persisted, only these two aggregates.
pub async fn record_event(pool: &SqlitePool, event: &UsageEvent) -> Result<()> {
    let day = event.timestamp.format("%Y-%m-%d").to_string();
    sqlx::query(
        "INSERT INTO analytics (feature_tag, day, count) VALUES (?, ?, 1)
         ON CONFLICT(feature_tag, day) DO UPDATE SET count = count + 1",
    )
    .bind(&event.feature_tag)
    .bind(day)
    .execute(pool)
    .await?;

    let seen_at = event.timestamp.to_rfc3339();
    sqlx::query(
        "INSERT INTO usage_by_user (user_id, first_seen, last_seen, interaction_count)
         VALUES (?, ?, ?, 1)
         ON CONFLICT(user_id) DO UPDATE SET last_seen = excluded.last_seen, interaction_count = interaction_count + 1",
    )
    .bind(&event.user_id)
    .bind(&seen_at)
    .bind(&seen_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reads back one day's counter for `feature_tag`, or 0 if untouched.
pub async fn count_for_day(pool: &SqlitePool, feature_tag: &str, day: DateTime<Utc>) -> Result<i64> {
    let day = day.format("%Y-%m-%d").to_string();
    let row: Option<(i64,)> = sqlx::query_as("SELECT count FROM analytics WHERE feature_tag = ? AND day = ?")
        .bind(feature_tag)
        .bind(day)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(count,)| count).unwrap_or(0))
}

#[derive(Debug, FromRow)]
struct UserUsageRow {
    user_id: String,
    first_seen: String,
    last_seen: String,
    interaction_count: i64,
}

impl UserUsageRow {
    fn into_model(self) -> UserUsage {
        UserUsage {
            user_id: self.user_id,
            first_seen: self.first_seen.parse().unwrap_or_else(|_| Utc::now()),
            last_seen: self.last_seen.parse().unwrap_or_else(|_| Utc::now()),
            interaction_count: self.interaction_count,
        }
    }
}

/// The per-user aggregate for a hashed user id, if it has ever recorded an
/// event.
pub async fn get_user_usage(pool: &SqlitePool, hashed_user_id: &str) -> Result<Option<UserUsage>> {
    let row: Option<UserUsageRow> = sqlx::query_as(
        "SELECT user_id, first_seen, last_seen, interaction_count FROM usage_by_user WHERE user_id = ?",
    )
    .bind(hashed_user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(UserUsageRow::into_model))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user_id: &str, feature_tag: &str, timestamp: DateTime<Utc>) -> UsageEvent {
        UsageEvent {
            user_id: user_id.to_string(),
            feature_tag: feature_tag.to_string(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn repeated_events_accumulate_the_same_days_feature_counter() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::init(&pool).await.unwrap();
        let now = Utc::now();

        record_event(&pool, &event("abc", "route", now)).await.unwrap();
        record_event(&pool, &event("abc", "route", now)).await.unwrap();
        record_event(&pool, &event("abc", "schedule", now)).await.unwrap();

        assert_eq!(count_for_day(&pool, "route", now).await.unwrap(), 2);
        assert_eq!(count_for_day(&pool, "schedule", now).await.unwrap(), 1);
        assert_eq!(count_for_day(&pool, "stations", now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeated_events_fold_into_the_per_user_aggregate() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::init(&pool).await.unwrap();
        let first = Utc::now() - chrono::Duration::hours(1);
        let second = Utc::now();

        record_event(&pool, &event("hash1", "route", first)).await.unwrap();
        record_event(&pool, &event("hash1", "schedule", second)).await.unwrap();

        let usage = get_user_usage(&pool, "hash1").await.unwrap().unwrap();
        assert_eq!(usage.interaction_count, 2);
        assert_eq!(usage.first_seen.timestamp(), first.timestamp());
        assert_eq!(usage.last_seen.timestamp(), second.timestamp());
    }

    #[tokio::test]
    async fn unknown_user_has_no_aggregate() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::init(&pool).await.unwrap();
        assert!(get_user_usage(&pool, "never-seen").await.unwrap().is_none());
    }
}
