use async_trait::async_trait;
use model::Lang;

/// Delivers the "prepare to exit" message when a reminder fires. The bot
/// transport is an external collaborator (spec §1); this trait is the seam
/// it plugs into, mirroring how `router`/`store` depend on `Network`/`Store`
/// rather than a concrete transport.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn notify_prepare_to_exit(&self, user_id: i64, lang: Lang, station_id: &str);
}

/// A notifier that only logs. Useful for the CLI and for tests, where no
/// chat transport is wired up.
pub struct LoggingNotifier;

#[async_trait]
impl ReminderNotifier for LoggingNotifier {
    async fn notify_prepare_to_exit(&self, user_id: i64, lang: Lang, station_id: &str) {
        tracing::info!(user_id, station_id, ?lang, "reminder fired");
    }
}
