//! Durable reminder scheduler (spec component F). Ports the teacher's
//! `actors` mailbox/supervision pattern to a single-purpose per-user timer
//! actor: one mailbox, one `ReminderActor`, one in-memory timer per user.

mod actor;
pub mod error;
mod messages;
pub mod notifier;

use std::sync::{Arc, OnceLock};

use actors::actor_ref::ActorRef;
use chrono::{DateTime, Utc};
use model::Lang;
use network::Network;
use store::Store;

pub use error::SchedulerError;
pub use notifier::{LoggingNotifier, ReminderNotifier};

use actor::ReminderActor;
use messages::{Arm, Cancel, Housekeep, Restore};

/// Handle to the running reminder actor. Cheap to clone: cloning shares the
/// same underlying actor mailbox.
#[derive(Clone)]
pub struct Scheduler {
    actor_ref: ActorRef<ReminderActor>,
}

impl Scheduler {
    /// Spawns the actor's supervised mailbox loop. Does not restore any
    /// reminders from the store; call [`Scheduler::restore`] once at
    /// startup for that.
    pub fn start(store: Store, network: Arc<Network>, notifier: Arc<dyn ReminderNotifier>) -> Self {
        let self_ref: Arc<OnceLock<ActorRef<ReminderActor>>> = Arc::new(OnceLock::new());

        let factory_store = store;
        let factory_network = network;
        let factory_notifier = notifier;
        let factory_self_ref = self_ref.clone();

        let actor_ref = actors::run(move || {
            ReminderActor::new(
                factory_store.clone(),
                factory_network.clone(),
                factory_notifier.clone(),
                factory_self_ref.clone(),
            )
        });

        // Safe: nothing can reach the actor (and thus spawn a timer that
        // needs `self_ref`) until this function returns the `Scheduler`.
        let _ = self_ref.set(actor_ref.clone());

        Self { actor_ref }
    }

    /// Persists the reminder, cancels any existing in-memory timer for the
    /// user, and schedules a single-shot delivery at `remind_at - now()`.
    pub async fn arm(
        &self,
        user_id: i64,
        route_fingerprint: impl Into<String>,
        station_id: impl Into<String>,
        remind_at: DateTime<Utc>,
        lang: Lang,
    ) -> Result<i64, SchedulerError> {
        self.actor_ref
            .ask(Arm {
                user_id,
                route_fingerprint: route_fingerprint.into(),
                station_id: station_id.into(),
                remind_at,
                lang,
            })
            .await?
    }

    /// Cancels the in-memory timer and marks the persistent reminder
    /// inactive.
    pub async fn cancel(&self, user_id: i64) -> Result<(), SchedulerError> {
        self.actor_ref.ask(Cancel { user_id }).await?
    }

    /// Startup recovery: deactivates reminders whose station is unknown or
    /// whose `remind_at` is already past, and re-arms in-memory timers for
    /// the rest. Returns how many were re-armed.
    pub async fn restore(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        self.actor_ref.ask(Restore { now }).await?
    }

    /// Hourly housekeeping: deactivates any reminder whose `remind_at` is
    /// now in the past without having fired (the crash window). Returns how
    /// many were swept.
    pub async fn housekeep(&self, now: DateTime<Utc>) -> Result<u64, SchedulerError> {
        self.actor_ref.ask(Housekeep { now }).await?
    }

    /// Runs the hourly housekeeping sweep forever. Intended to be spawned
    /// once as its own task by the owning binary.
    pub async fn run_housekeeping_loop(self) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            if let Err(err) = self.housekeep(Utc::now()).await {
                tracing::error!(%err, "reminder housekeeping sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tokio::sync::Mutex;

    const SAMPLE_NETWORK: &str = r#"
[lines]
order = ["K"]

[lines.K]
stations = [
    { id = "kholodna_hora", name_ua = "Холодна гора", name_en = "Kholodna Hora" },
    { id = "zavod_imeni_malysheva", name_ua = "Завод ім. Малишева", name_en = "Zavod imeni Malysheva" },
]

[transfers]

[aliases]

[line_meta.K]
color = "#D0312D"
emoji = "🔴"
name_ua = "Холодногірсько-заводська лінія"
name_en = "Kholodnohirsko-Zavodska line"
display_ua = "К"
display_en = "K"

[day_types.weekday]
emoji = "📆"
name_ua = "Будній"
name_en = "Weekday"

[day_types.weekend]
emoji = "🌞"
name_ua = "Вихідний"
name_en = "Weekend"
"#;

    struct RecordingNotifier {
        fired: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait::async_trait]
    impl ReminderNotifier for RecordingNotifier {
        async fn notify_prepare_to_exit(&self, user_id: i64, _lang: Lang, station_id: &str) {
            self.fired.lock().await.push((user_id, station_id.to_string()));
        }
    }

    async fn sample_scheduler() -> (Scheduler, Arc<RecordingNotifier>, Store) {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();
        let network = Arc::new(network::Network::load(SAMPLE_NETWORK).unwrap());
        let notifier = Arc::new(RecordingNotifier {
            fired: Mutex::new(Vec::new()),
        });
        let scheduler = Scheduler::start(store.clone(), network, notifier.clone());
        (scheduler, notifier, store)
    }

    #[tokio::test]
    async fn arming_twice_replaces_the_pending_reminder() {
        let (scheduler, _notifier, store) = sample_scheduler().await;
        let now = Utc::now();

        let first = scheduler
            .arm(1, "fp", "kholodna_hora", now + Duration::hours(1), Lang::Ua)
            .await
            .unwrap();
        let second = scheduler
            .arm(1, "fp", "zavod_imeni_malysheva", now + Duration::hours(2), Lang::Ua)
            .await
            .unwrap();
        assert_ne!(first, second);

        let active = store::reminders::get_active_for_user(store.pool(), 1).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second);
    }

    #[tokio::test]
    async fn cancel_deactivates_the_persisted_reminder() {
        let (scheduler, _notifier, store) = sample_scheduler().await;
        let now = Utc::now();
        scheduler
            .arm(2, "fp", "kholodna_hora", now + Duration::hours(1), Lang::Ua)
            .await
            .unwrap();

        scheduler.cancel(2).await.unwrap();

        let active = store::reminders::get_active_for_user(store.pool(), 2).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn firing_marks_the_reminder_inactive_and_notifies() {
        let (scheduler, notifier, store) = sample_scheduler().await;
        let now = Utc::now();
        scheduler
            .arm(3, "fp", "kholodna_hora", now + Duration::milliseconds(20), Lang::En)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let active = store::reminders::get_active_for_user(store.pool(), 3).await.unwrap();
        assert!(active.is_empty());
        let fired = notifier.fired.lock().await;
        assert_eq!(fired.as_slice(), &[(3, "kholodna_hora".to_string())]);
    }

    #[tokio::test]
    async fn restore_reattaches_timers_and_drops_unknown_stations() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();
        let now = Utc::now();

        store::reminders::insert(store.pool(), 10, "fp", "kholodna_hora", now + Duration::hours(1), Lang::Ua)
            .await
            .unwrap();
        let stale_id = store::reminders::insert(store.pool(), 11, "fp", "kholodna_hora", now - Duration::minutes(5), Lang::Ua)
            .await
            .unwrap();
        let unknown_id = store::reminders::insert(store.pool(), 12, "fp", "no_such_station", now + Duration::hours(1), Lang::Ua)
            .await
            .unwrap();

        let network = Arc::new(network::Network::load(SAMPLE_NETWORK).unwrap());
        let notifier = Arc::new(RecordingNotifier {
            fired: Mutex::new(Vec::new()),
        });
        let scheduler = Scheduler::start(store.clone(), network, notifier);

        let restored = scheduler.restore(now).await.unwrap();
        assert_eq!(restored, 1);

        let still_active = store::reminders::get_active_for_user(store.pool(), 10).await.unwrap();
        assert_eq!(still_active.len(), 1);

        let stale_active = store::reminders::get_active_for_user(store.pool(), 11).await.unwrap();
        assert!(stale_active.is_empty());
        let unknown_active = store::reminders::get_active_for_user(store.pool(), 12).await.unwrap();
        assert!(unknown_active.is_empty());
        let _ = (stale_id, unknown_id);
    }

    #[tokio::test]
    async fn housekeeping_sweeps_overdue_reminders_without_live_timers() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();
        let now = Utc::now();

        // Inserted directly (bypassing `arm`), simulating a row left over
        // from a process that crashed before its timer could fire.
        store::reminders::insert(store.pool(), 20, "fp", "kholodna_hora", now - Duration::minutes(1), Lang::Ua)
            .await
            .unwrap();

        let network = Arc::new(network::Network::load(SAMPLE_NETWORK).unwrap());
        let notifier = Arc::new(RecordingNotifier {
            fired: Mutex::new(Vec::new()),
        });
        let scheduler = Scheduler::start(store.clone(), network, notifier);

        let swept = scheduler.housekeep(now).await.unwrap();
        assert_eq!(swept, 1);

        let active = store::reminders::get_active_for_user(store.pool(), 20).await.unwrap();
        assert!(active.is_empty());
    }
}
