use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One opt-in analytics record: which feature was touched, by whom, when
/// (spec §3). `user_id` is salted-hashed before it ever reaches this type
/// when `ENABLE_ANALYTICS` is on, so this struct itself carries no PII
/// obligation beyond what the caller already committed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub user_id: String,
    pub feature_tag: String,
    pub timestamp: DateTime<Utc>,
}

/// The per-user aggregate `UsageEvent` rows are folded into (spec §3):
/// first/last time this hashed user was seen at all, and how many events
/// total, independent of which feature each one touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUsage {
    pub user_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub interaction_count: i64,
}
