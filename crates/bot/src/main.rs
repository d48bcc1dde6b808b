mod error;
mod notifier;
mod telegram;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use config::Settings;
use conversation::{Engine, Outcome};
use error::BotError;
use graph::Graph;
use model::{Lang, SessionKey};
use notifier::TelegramNotifier;
use router::Router;
use scheduler::Scheduler;
use store::Store;
use telegram::TelegramClient;
use transport::{ChatTransport, Update, UpdateKind};

/// All conversation sessions driven by this bot share one context per
/// chat; hosts that support parallel threads would vary this per thread.
const DESTINY_TAG: &str = "default";

fn now_in_tz(tz_name: &str) -> DateTime<FixedOffset> {
    match tz_name.parse::<chrono_tz::Tz>() {
        Ok(tz) => Utc::now().with_timezone(&tz).fixed_offset(),
        Err(_) => Utc::now().fixed_offset(),
    }
}

async fn resolve_lang(store: &Store, user_id: i64, language_code: Option<&str>) -> Lang {
    if let Ok(Some(lang)) = store::users::get_language(store.pool(), user_id).await {
        return lang;
    }
    let lang = language_code.and_then(Lang::from_code).unwrap_or_default();
    let _ = store::users::set_language(store.pool(), user_id, lang).await;
    lang
}

struct Bot {
    engine: Engine,
    transport: Arc<dyn ChatTransport>,
    user_store: Store,
    tz: String,
}

impl Bot {
    async fn handle_update(&self, update: Update) -> Result<(), BotError> {
        match update.kind {
            UpdateKind::Message { text } => self.handle_message(update.chat_id, update.user_id, update.language_code.as_deref(), &text).await,
            UpdateKind::Callback { callback_id, data } => {
                let result = self.handle_callback(update.chat_id, update.user_id, update.language_code.as_deref(), &data).await;
                self.transport.answer_callback(&callback_id).await?;
                result
            }
        }
    }

    async fn handle_message(&self, chat_id: i64, user_id: i64, language_code: Option<&str>, text: &str) -> Result<(), BotError> {
        let lang = resolve_lang(&self.user_store, user_id, language_code).await;
        let key = SessionKey::new(chat_id, user_id, DESTINY_TAG);

        let outcome = if text.trim_start().starts_with("/start") {
            self.engine.start(&key, lang).await?
        } else {
            let now = now_in_tz(&self.tz);
            self.engine.handle(&key, lang, now, text.trim()).await?
        };

        self.deliver(chat_id, outcome).await
    }

    async fn handle_callback(&self, chat_id: i64, user_id: i64, language_code: Option<&str>, data: &str) -> Result<(), BotError> {
        let lang = resolve_lang(&self.user_store, user_id, language_code).await;

        if let Some(callback) = conversation::fingerprint::parse_remind_payload(data) {
            return self.handle_remind_callback(chat_id, user_id, lang, callback).await;
        }

        let key = SessionKey::new(chat_id, user_id, DESTINY_TAG);
        let now = now_in_tz(&self.tz);
        let outcome = self.engine.handle(&key, lang, now, data).await?;
        self.deliver(chat_id, outcome).await
    }

    async fn handle_remind_callback(
        &self,
        chat_id: i64,
        user_id: i64,
        lang: Lang,
        callback: conversation::fingerprint::RemindCallback,
    ) -> Result<(), BotError> {
        use conversation::fingerprint::RemindCallback;
        let text = match callback {
            RemindCallback::Arm { fingerprint, group_index, remind_at_epoch } => {
                match self.engine.arm_reminder_from_offer(user_id, lang, &fingerprint, group_index, remind_at_epoch).await {
                    Ok(_) => match lang {
                        Lang::Ua => "🔔 Нагадування встановлено.",
                        Lang::En => "🔔 Reminder set.",
                    },
                    Err(_) => match lang {
                        Lang::Ua => "Маршрут застарів, спробуйте знову.",
                        Lang::En => "That route has expired, try again.",
                    },
                }
            }
            RemindCallback::Cancel { .. } => {
                self.engine.cancel_reminder(user_id).await?;
                match lang {
                    Lang::Ua => "Нагадування скасовано.",
                    Lang::En => "Reminder cancelled.",
                }
            }
        };
        self.transport.send_text(chat_id, text).await?;
        Ok(())
    }

    async fn deliver(&self, chat_id: i64, outcome: Outcome) -> Result<(), BotError> {
        self.transport.send_prompt(chat_id, &outcome.prompt).await?;
        if let Some(offer) = outcome.reminder_offer {
            if !offer.buttons.is_empty() {
                let prompt = reminder_offer_prompt(&offer);
                self.transport.send_prompt(chat_id, &prompt).await?;
            }
        }
        Ok(())
    }
}

fn reminder_offer_prompt(offer: &conversation::ReminderOffer) -> conversation::Prompt {
    let rows = offer
        .buttons
        .iter()
        .map(|button| {
            vec![conversation::keyboard::KeyboardButton {
                label: button.label.clone(),
                data: button.arm_payload.clone(),
            }]
        })
        .collect();
    conversation::Prompt {
        text: "Want an exit reminder?".to_string(),
        keyboard: conversation::keyboard::Keyboard { rows },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let settings = Settings::load()?;
    let bot_token = settings.bot_token.clone().ok_or_else(|| anyhow::anyhow!("BOT_TOKEN is required to run the bot"))?;

    let network = Arc::new(network::load_bundled()?);
    let graph = Arc::new(Graph::build(&network));

    let metro_path = settings.metro_db_path.to_string_lossy().to_string();
    let metro_store = Store::open(&metro_path).await?;
    store::stations::save_stations(metro_store.pool(), &network.stations().cloned().collect::<Vec<_>>()).await?;

    let user_path = settings.user_data_db_path.to_string_lossy().to_string();
    let user_store = Store::open(&user_path).await?;

    let router = Router::new(network.clone(), graph.clone(), metro_store.clone());
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramClient::new(&bot_token));

    let notifier = Arc::new(TelegramNotifier::new(transport.clone(), network.clone()));
    let scheduler = Scheduler::start(user_store.clone(), network.clone(), notifier);

    let restored = scheduler.restore(Utc::now()).await?;
    tracing::info!(restored, "reminders restored at startup");
    tokio::spawn(scheduler.clone().run_housekeeping_loop());

    let engine = Engine::new(network.clone(), Arc::new(router), user_store.clone(), scheduler)
        .with_analytics(settings.enable_analytics, settings.analytics_salt.clone());

    let bot = Arc::new(Bot { engine, transport: transport.clone(), user_store, tz: settings.tz.clone() });

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(());
        }
    });

    let mut offset: i64 = 0;
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                tracing::info!("shutting down");
                break;
            }
            updates = transport.poll_updates(offset) => {
                match updates {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let bot = bot.clone();
                            tokio::spawn(async move {
                                if let Err(err) = bot.handle_update(update).await {
                                    tracing::error!(%err, "failed to handle update");
                                }
                            });
                        }
                    }
                    Err(err) => {
                        tracing::error!(%err, "poll_updates failed");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation::prompt::{ReminderOffer, ReminderOfferButton};

    #[test]
    fn now_in_tz_falls_back_to_utc_for_an_unknown_zone() {
        let utc = Utc::now().fixed_offset();
        let resolved = now_in_tz("not/a_real_zone");
        assert_eq!(resolved.offset().local_minus_utc(), utc.offset().local_minus_utc());
    }

    #[test]
    fn now_in_tz_resolves_a_known_zone() {
        let resolved = now_in_tz("Europe/Kyiv");
        assert!(resolved.offset().local_minus_utc() >= 0);
    }

    #[test]
    fn reminder_offer_prompt_renders_one_button_per_row() {
        let offer = ReminderOffer {
            route_fingerprint: "fp".to_string(),
            buttons: vec![
                ReminderOfferButton { group_index: 0, label: "Leg 1".to_string(), arm_payload: "arm:fp:0:123".to_string() },
                ReminderOfferButton { group_index: 1, label: "Leg 2".to_string(), arm_payload: "arm:fp:1:456".to_string() },
            ],
        };
        let prompt = reminder_offer_prompt(&offer);
        assert_eq!(prompt.keyboard.rows.len(), 2);
        assert_eq!(prompt.keyboard.rows[0].len(), 1);
        assert_eq!(prompt.keyboard.rows[0][0].data, "arm:fp:0:123");
        assert_eq!(prompt.keyboard.rows[1][0].label, "Leg 2");
    }
}
