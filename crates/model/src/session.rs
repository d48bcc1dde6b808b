use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one conversation context. `destiny_tag` distinguishes parallel
/// conversation contexts on hosts that support them (e.g. topics/threads);
/// hosts that don't just pass a constant tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
    pub destiny_tag: String,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: i64, destiny_tag: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            destiny_tag: destiny_tag.into(),
        }
    }
}

/// Persisted state for one `SessionKey` (spec §3). `updated_at` is bumped on
/// every state or data write and drives the TTL garbage collector.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(skip)]
    pub key: SessionKeyDto,
    pub state: Option<String>,
    pub data: HashMap<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// `SessionKey`, serializable for the rare surfaces that need to echo it
/// back (schemars needs a concrete, non-skipped shape here).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SessionKeyDto {
    pub chat_id: i64,
    pub user_id: i64,
    pub destiny_tag: String,
}
