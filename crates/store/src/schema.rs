use sqlx::SqlitePool;

use crate::error::Result;

/// Creates every table and index if absent, then runs the one-time
/// `users.language` migration (spec §6: "a single ALTER adds a `language`
/// column to the users table if absent").
pub async fn init(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stations (
            id TEXT PRIMARY KEY,
            name_ua TEXT NOT NULL,
            name_en TEXT NOT NULL,
            line TEXT NOT NULL,
            order_on_line INTEGER NOT NULL,
            transfer_to TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schedules (
            station_id TEXT NOT NULL,
            direction_terminal_id TEXT NOT NULL,
            day_type TEXT NOT NULL,
            hour INTEGER NOT NULL,
            minute INTEGER NOT NULL,
            PRIMARY KEY (station_id, direction_terminal_id, day_type, hour, minute)
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_lookup
            ON schedules(station_id, direction_terminal_id, day_type)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_ordered
            ON schedules(station_id, direction_terminal_id, day_type, hour, minute)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            destiny_tag TEXT NOT NULL,
            state TEXT,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (chat_id, user_id, destiny_tag)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS reminders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            route_fingerprint TEXT NOT NULL,
            station_id TEXT NOT NULL,
            remind_at TEXT NOT NULL,
            lang TEXT NOT NULL,
            active INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reminders_user_active
            ON reminders(user_id, active)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reminders_remind_at ON reminders(remind_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY
        )",
    )
    .execute(pool)
    .await?;
    migrate_users_language_column(pool).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analytics (
            feature_tag TEXT NOT NULL,
            day TEXT NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY (feature_tag, day)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS usage_by_user (
            user_id TEXT PRIMARY KEY,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            interaction_count INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn migrate_users_language_column(pool: &SqlitePool) -> Result<()> {
    let columns: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as("PRAGMA table_info(users)")
            .fetch_all(pool)
            .await?;

    let has_language = columns.iter().any(|(_, name, ..)| name == "language");
    if !has_language {
        tracing::info!("running one-time migration: users.language");
        sqlx::query("ALTER TABLE users ADD COLUMN language TEXT")
            .execute(pool)
            .await?;
    }

    Ok(())
}
