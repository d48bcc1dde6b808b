use async_trait::async_trait;
use conversation::Prompt;

use crate::error::BotError;

/// One inbound event from the chat host, normalized away from whatever
/// wire shape the concrete transport speaks.
#[derive(Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub language_code: Option<String>,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone)]
pub enum UpdateKind {
    /// A typed message, including `/start`.
    Message { text: String },
    /// An inline-keyboard button press. `callback_id` is acknowledged back
    /// to the host so its client stops showing a loading spinner.
    Callback { callback_id: String, data: String },
}

/// External collaborator contract (spec §1): the bot transport is
/// something this crate depends on, not something it is. A long-poll
/// Telegram-style client is the only implementation shipped, but any host
/// that can poll for updates and push text+keyboard back plugs in here.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Long-polls for the next batch of updates strictly after `offset`.
    async fn poll_updates(&self, offset: i64) -> Result<Vec<Update>, BotError>;

    /// Sends `prompt` to `chat_id`, rendering its keyboard as the host's
    /// native reply markup.
    async fn send_prompt(&self, chat_id: i64, prompt: &Prompt) -> Result<(), BotError>;

    /// Sends a plain text message with no keyboard (used for reminder
    /// delivery and for transient notices).
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), BotError>;

    /// Acknowledges a callback so the host's client stops spinning.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotError>;
}
