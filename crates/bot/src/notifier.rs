use std::sync::Arc;

use async_trait::async_trait;
use model::Lang;
use scheduler::ReminderNotifier;

use crate::transport::ChatTransport;

/// Delivers "prepare to exit" reminders over a [`ChatTransport`] (spec §4.F
/// / §7: "reminder delivery failures are swallowed with a log entry").
/// Reminders are keyed by `user_id` only; this bot only serves private
/// chats, where the host's chat id and user id coincide.
pub struct TelegramNotifier {
    transport: Arc<dyn ChatTransport>,
    network: Arc<network::Network>,
}

impl TelegramNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>, network: Arc<network::Network>) -> Self {
        Self { transport, network }
    }
}

#[async_trait]
impl ReminderNotifier for TelegramNotifier {
    async fn notify_prepare_to_exit(&self, user_id: i64, lang: Lang, station_id: &str) {
        let station_name = self.network.station(station_id).map(|s| s.name.get(lang).to_string()).unwrap_or_else(|| station_id.to_string());
        let text = match lang {
            Lang::Ua => format!("🔔 Готуйтесь виходити: {station_name}"),
            Lang::En => format!("🔔 Get ready to get off: {station_name}"),
        };
        if let Err(err) = self.transport.send_text(user_id, &text).await {
            tracing::warn!(user_id, %err, "failed to deliver reminder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transport::Update;
    use conversation::Prompt;
    use tokio::sync::Mutex;

    const SAMPLE_NETWORK: &str = r#"
[lines]
order = ["K"]

[lines.K]
stations = [
    { id = "kholodna_hora", name_ua = "Холодна гора", name_en = "Kholodna Hora" },
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

    struct RecordingTransport {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn poll_updates(&self, _offset: i64) -> Result<Vec<Update>> {
            Ok(Vec::new())
        }
        async fn send_prompt(&self, _chat_id: i64, _prompt: &Prompt) -> Result<()> {
            Ok(())
        }
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().await.push((chat_id, text.to_string()));
            Ok(())
        }
        async fn answer_callback(&self, _callback_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn notify_sends_a_localized_text_to_the_user_id_as_chat_id() {
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
        let network = Arc::new(network::Network::load(SAMPLE_NETWORK).unwrap());
        let notifier = TelegramNotifier::new(transport.clone(), network);

        notifier.notify_prepare_to_exit(77, Lang::Ua, "kholodna_hora").await;

        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 77);
        assert!(sent[0].1.contains("Холодна гора"));
    }

    #[tokio::test]
    async fn notify_falls_back_to_the_raw_station_id_when_unknown() {
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
        let network = Arc::new(network::Network::load(SAMPLE_NETWORK).unwrap());
        let notifier = TelegramNotifier::new(transport.clone(), network);

        notifier.notify_prepare_to_exit(1, Lang::En, "no_such_station").await;

        let sent = transport.sent.lock().await;
        assert!(sent[0].1.contains("no_such_station"));
    }
}
