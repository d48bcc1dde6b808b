pub mod analytics;
pub mod error;
pub mod reminders;
pub mod schedules;
pub mod schema;
pub mod sessions;
pub mod stations;
pub mod users;

use std::str::FromStr;

use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};

pub use error::{Result, StoreError};

/// The single-file timetable + session + reminder store (spec §4.B, §4.E,
/// §4.F share one file, multiple tables). Cheap to clone: it wraps a
/// connection pool, and each operation opens and releases its own
/// connection for the duration of the call.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if absent) the SQLite file at `path` and runs schema
    /// initialization. Idempotent: safe to call on every process start.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        schema::init(&pool).await?;
        Ok(Self { pool })
    }

    /// Builds a store over an already-open pool, e.g. an in-memory
    /// connection shared by tests.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        schema::init(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use model::{DayType, Lang, SessionKey, StationSchedule};
    use std::collections::HashMap;

    use super::*;

    async fn memory_store() -> Store {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        Store::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn session_set_state_preserves_data() {
        let store = memory_store().await;
        let key = SessionKey::new(1, 2, "default");

        let mut data = HashMap::new();
        data.insert("line".to_string(), serde_json::json!("K"));
        sessions::set_data(store.pool(), &key, &data).await.unwrap();
        sessions::set_state(store.pool(), &key, Some("FromStation")).await.unwrap();

        assert_eq!(
            sessions::get_state(store.pool(), &key).await.unwrap().as_deref(),
            Some("FromStation")
        );
        assert_eq!(
            sessions::get_data(store.pool(), &key).await.unwrap().get("line"),
            Some(&serde_json::json!("K"))
        );
    }

    #[tokio::test]
    async fn update_data_merges_rather_than_replaces() {
        let store = memory_store().await;
        let key = SessionKey::new(1, 2, "default");

        let mut first = HashMap::new();
        first.insert("a".to_string(), serde_json::json!(1));
        sessions::set_data(store.pool(), &key, &first).await.unwrap();

        let mut patch = HashMap::new();
        patch.insert("b".to_string(), serde_json::json!(2));
        sessions::update_data(store.pool(), &key, patch).await.unwrap();

        let data = sessions::get_data(store.pool(), &key).await.unwrap();
        assert_eq!(data.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(data.get("b"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn get_all_schedules_for_station_groups_by_direction_in_one_query() {
        let store = memory_store().await;
        let mut schedule_a = StationSchedule {
            station_id: "s".into(),
            direction_terminal_id: "terminal_a".into(),
            day_type: DayType::Weekday,
            entries: vec![
                model::ScheduleEntry::new(6, 0),
                model::ScheduleEntry::new(6, 10),
            ],
        };
        schedule_a.normalize();
        let mut schedule_b = StationSchedule {
            station_id: "s".into(),
            direction_terminal_id: "terminal_b".into(),
            day_type: DayType::Weekday,
            entries: vec![model::ScheduleEntry::new(6, 5)],
        };
        schedule_b.normalize();

        schedules::save_schedules(store.pool(), &[schedule_a, schedule_b])
            .await
            .unwrap();

        let grouped = schedules::get_all_schedules_for_station(store.pool(), "s", DayType::Weekday)
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
    }

    #[tokio::test]
    async fn is_metro_open_true_on_empty_table() {
        let store = memory_store().await;
        let (open, _, _) = schedules::is_metro_open(
            store.pool(),
            DayType::Weekday,
            model::ScheduleEntry::new(3, 0),
            90,
        )
        .await
        .unwrap();
        assert!(open);
    }

    #[tokio::test]
    async fn reminder_restore_picks_up_active_rows() {
        let store = memory_store().await;
        let remind_at = Utc::now() + Duration::minutes(5);
        reminders::insert(store.pool(), 42, "abc123abc123", "station_a", remind_at, Lang::Ua)
            .await
            .unwrap();

        let active = reminders::get_all_active(store.pool()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, 42);
    }

    #[tokio::test]
    async fn housekeeping_sweeps_overdue_reminders() {
        let store = memory_store().await;
        let past = Utc::now() - Duration::minutes(1);
        reminders::insert(store.pool(), 7, "fingerprint01", "station_b", past, Lang::En)
            .await
            .unwrap();

        let swept = reminders::deactivate_overdue(store.pool(), Utc::now()).await.unwrap();
        assert_eq!(swept, 1);
        assert!(reminders::get_all_active(store.pool()).await.unwrap().is_empty());
    }
}
