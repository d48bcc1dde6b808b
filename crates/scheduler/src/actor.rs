use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use actors::actor::{Actor, SupervisionStrategy};
use actors::actor_ref::ActorRef;
use actors::handler::Handler;
use async_trait::async_trait;
use chrono::Utc;
use network::Network;
use store::Store;
use tokio::task::JoinHandle;

use crate::error::SchedulerError;
use crate::messages::{Arm, Cancel, Fire, Housekeep, Restore};
use crate::notifier::ReminderNotifier;

/// Owns every in-flight reminder timer. At most one pending reminder per
/// user (spec §4.F); arming replaces the previous one, firing and
/// cancelling both remove it atomically with the deactivation write.
pub struct ReminderActor {
    pub(crate) store: Store,
    pub(crate) network: Arc<Network>,
    pub(crate) notifier: Arc<dyn ReminderNotifier>,
    pub(crate) self_ref: Arc<OnceLock<ActorRef<ReminderActor>>>,
    pending: HashMap<i64, JoinHandle<()>>,
}

impl ReminderActor {
    pub(crate) fn new(
        store: Store,
        network: Arc<Network>,
        notifier: Arc<dyn ReminderNotifier>,
        self_ref: Arc<OnceLock<ActorRef<ReminderActor>>>,
    ) -> Self {
        Self {
            store,
            network,
            notifier,
            self_ref,
            pending: HashMap::new(),
        }
    }

    fn cancel_pending(&mut self, user_id: i64) {
        if let Some(handle) = self.pending.remove(&user_id) {
            handle.abort();
        }
    }

    /// Schedules the single-shot delivery at `remind_at - now()`. A
    /// `remind_at` already in the past fires immediately.
    fn spawn_timer(
        &mut self,
        reminder_id: i64,
        user_id: i64,
        station_id: String,
        lang: model::Lang,
        remind_at: chrono::DateTime<Utc>,
    ) {
        let delay = (remind_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let self_ref = self.self_ref.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(actor_ref) = self_ref.get() {
                let _ = actor_ref
                    .tell(Fire {
                        reminder_id,
                        user_id,
                        station_id,
                        lang,
                    })
                    .await;
            }
        });
        self.pending.insert(user_id, handle);
    }
}

impl Actor for ReminderActor {
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        tracing::error!("reminder actor handler panicked: {:?}", error);
        SupervisionStrategy::Restart
    }
}

#[async_trait]
impl Handler<Arm> for ReminderActor {
    async fn handle(&mut self, msg: Arm) -> Result<i64, SchedulerError> {
        self.cancel_pending(msg.user_id);
        store::reminders::deactivate_active_for_user(self.store.pool(), msg.user_id).await?;
        let reminder_id = store::reminders::insert(
            self.store.pool(),
            msg.user_id,
            &msg.route_fingerprint,
            &msg.station_id,
            msg.remind_at,
            msg.lang,
        )
        .await?;
        tracing::info!(
            user_id = msg.user_id,
            reminder_id,
            station_id = %msg.station_id,
            "armed reminder"
        );
        self.spawn_timer(reminder_id, msg.user_id, msg.station_id, msg.lang, msg.remind_at);
        Ok(reminder_id)
    }
}

#[async_trait]
impl Handler<Cancel> for ReminderActor {
    async fn handle(&mut self, msg: Cancel) -> Result<(), SchedulerError> {
        self.cancel_pending(msg.user_id);
        store::reminders::deactivate_active_for_user(self.store.pool(), msg.user_id).await?;
        tracing::info!(user_id = msg.user_id, "cancelled reminder");
        Ok(())
    }
}

#[async_trait]
impl Handler<Restore> for ReminderActor {
    async fn handle(&mut self, msg: Restore) -> Result<usize, SchedulerError> {
        let active = store::reminders::get_all_active(self.store.pool()).await?;
        let mut restored = 0usize;
        for reminder in active {
            if self.network.station(&reminder.station_id).is_none() || reminder.remind_at <= msg.now {
                store::reminders::deactivate(self.store.pool(), reminder.id).await?;
                continue;
            }
            self.spawn_timer(
                reminder.id,
                reminder.user_id,
                reminder.station_id,
                reminder.lang,
                reminder.remind_at,
            );
            restored += 1;
        }
        tracing::info!(restored, "restored reminders from store");
        Ok(restored)
    }
}

#[async_trait]
impl Handler<Housekeep> for ReminderActor {
    async fn handle(&mut self, msg: Housekeep) -> Result<u64, SchedulerError> {
        let swept = store::reminders::deactivate_overdue(self.store.pool(), msg.now).await?;
        if swept > 0 {
            tracing::warn!(swept, "housekeeping swept overdue reminders with no live timer");
        }
        Ok(swept)
    }
}

#[async_trait]
impl Handler<Fire> for ReminderActor {
    async fn handle(&mut self, msg: Fire) {
        self.pending.remove(&msg.user_id);
        match store::reminders::deactivate(self.store.pool(), msg.reminder_id).await {
            Ok(()) => {
                self.notifier
                    .notify_prepare_to_exit(msg.user_id, msg.lang, &msg.station_id)
                    .await;
            }
            Err(err) => {
                tracing::error!(reminder_id = msg.reminder_id, %err, "failed to deactivate fired reminder");
            }
        }
    }
}
