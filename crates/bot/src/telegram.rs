//! Long-poll Telegram Bot API client (spec §2: "thin... ships a long-poll
//! Telegram-style client"). Talks to `https://api.telegram.org` directly
//! with `reqwest`, the same HTTP client the teacher's scraper uses against
//! the transit authority's site.

use async_trait::async_trait;
use conversation::Prompt;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::transport::{ChatTransport, Update, UpdateKind};

/// How long the host holds a `getUpdates` request open waiting for new
/// events, in seconds.
const LONG_POLL_TIMEOUT_SECONDS: u32 = 30;

pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if self.ok {
            self.result.ok_or_else(|| BotError::Host("missing result on ok response".to_string()))
        } else {
            Err(BotError::Host(self.description.unwrap_or_else(|| "unknown error".to_string())))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    data: Option<String>,
    from: TgUser,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    language_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

fn updates_from_tg(updates: Vec<TgUpdate>) -> Vec<Update> {
    updates
        .into_iter()
        .filter_map(|update| {
            let update_id = update.update_id;
            if let Some(callback) = update.callback_query {
                let chat_id = callback.message.as_ref().map(|m| m.chat.id).unwrap_or(callback.from.id);
                return Some(Update {
                    update_id,
                    chat_id,
                    user_id: callback.from.id,
                    language_code: callback.from.language_code,
                    kind: UpdateKind::Callback {
                        callback_id: callback.id,
                        data: callback.data.unwrap_or_default(),
                    },
                });
            }
            let message = update.message?;
            let text = message.text?;
            let from = message.from?;
            Some(Update {
                update_id,
                chat_id: message.chat.id,
                user_id: from.id,
                language_code: from.language_code,
                kind: UpdateKind::Message { text },
            })
        })
        .collect()
}

fn to_markup(prompt: &Prompt) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: prompt
            .keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| InlineKeyboardButton {
                        text: button.label.clone(),
                        callback_data: button.data.clone(),
                    })
                    .collect()
            })
            .collect(),
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn poll_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response: ApiResponse<Vec<TgUpdate>> = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", LONG_POLL_TIMEOUT_SECONDS.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(updates_from_tg(response.into_result()?))
    }

    async fn send_prompt(&self, chat_id: i64, prompt: &Prompt) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": prompt.text,
            "reply_markup": to_markup(prompt),
        });
        let response: ApiResponse<serde_json::Value> =
            self.http.post(format!("{}/sendMessage", self.base_url)).json(&body).send().await?.json().await?;
        response.into_result().map(|_| ())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let response: ApiResponse<serde_json::Value> =
            self.http.post(format!("{}/sendMessage", self.base_url)).json(&body).send().await?.json().await?;
        response.into_result().map(|_| ())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        let response: ApiResponse<serde_json::Value> =
            self.http.post(format!("{}/answerCallbackQuery", self.base_url)).json(&body).send().await?.json().await?;
        response.into_result().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation::keyboard::{Keyboard, KeyboardButton};

    #[test]
    fn to_markup_preserves_row_and_button_shape() {
        let prompt = Prompt {
            text: "pick one".to_string(),
            keyboard: Keyboard {
                rows: vec![vec![
                    KeyboardButton { label: "A".to_string(), data: "a".to_string() },
                    KeyboardButton { label: "B".to_string(), data: "b".to_string() },
                ]],
            },
        };
        let markup = to_markup(&prompt);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].callback_data, "a");
    }

    #[test]
    fn api_response_ok_without_result_is_an_error() {
        let response: ApiResponse<serde_json::Value> = ApiResponse { ok: true, result: None, description: None };
        assert!(response.into_result().is_err());
    }

    #[test]
    fn api_response_not_ok_surfaces_description() {
        let response: ApiResponse<serde_json::Value> =
            ApiResponse { ok: false, result: None, description: Some("bad request".to_string()) };
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, BotError::Host(msg) if msg == "bad request"));
    }

    #[test]
    fn updates_from_tg_prefers_callback_over_message() {
        let update = TgUpdate {
            update_id: 7,
            message: None,
            callback_query: Some(TgCallbackQuery {
                id: "cb1".to_string(),
                data: Some("route:a:b".to_string()),
                from: TgUser { id: 42, language_code: Some("uk".to_string()) },
                message: Some(TgMessage { chat: TgChat { id: 100 }, from: None, text: None }),
            }),
        };
        let updates = updates_from_tg(vec![update]);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].chat_id, 100);
        assert_eq!(updates[0].user_id, 42);
        match &updates[0].kind {
            UpdateKind::Callback { callback_id, data } => {
                assert_eq!(callback_id, "cb1");
                assert_eq!(data, "route:a:b");
            }
            _ => panic!("expected a callback update"),
        }
    }

    #[test]
    fn updates_from_tg_drops_messages_with_no_text() {
        let update = TgUpdate {
            update_id: 1,
            message: Some(TgMessage { chat: TgChat { id: 1 }, from: Some(TgUser { id: 1, language_code: None }), text: None }),
            callback_query: None,
        };
        assert!(updates_from_tg(vec![update]).is_empty());
    }

    #[test]
    fn updates_from_tg_falls_back_to_caller_chat_id_when_callback_has_no_message() {
        let update = TgUpdate {
            update_id: 3,
            message: None,
            callback_query: Some(TgCallbackQuery {
                id: "cb2".to_string(),
                data: None,
                from: TgUser { id: 9, language_code: None },
                message: None,
            }),
        };
        let updates = updates_from_tg(vec![update]);
        assert_eq!(updates[0].chat_id, 9);
        match &updates[0].kind {
            UpdateKind::Callback { data, .. } => assert_eq!(data, ""),
            _ => panic!("expected a callback update"),
        }
    }
}
