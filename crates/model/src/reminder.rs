use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lang::Lang;

/// A standing "tell me when to leave" reminder armed against a route
/// fingerprint (spec §3). `remind_at` is the wall-clock moment the scheduler
/// fires at; `route_fingerprint` lets the scheduler re-derive the departure
/// without re-persisting the whole route.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub route_fingerprint: String,
    pub station_id: String,
    pub remind_at: DateTime<Utc>,
    pub lang: Lang,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// True once the scheduler has fired or the reminder has been cancelled;
    /// such rows are retained for the housekeeping sweep rather than deleted
    /// immediately, per spec §4.F.
    pub fn is_live(&self) -> bool {
        self.active
    }
}
