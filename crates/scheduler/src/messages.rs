use actors::handler::Message;
use chrono::{DateTime, Utc};
use model::Lang;

use crate::error::SchedulerError;

#[derive(Clone)]
pub struct Arm {
    pub user_id: i64,
    pub route_fingerprint: String,
    pub station_id: String,
    pub remind_at: DateTime<Utc>,
    pub lang: Lang,
}

impl Message for Arm {
    type Response = Result<i64, SchedulerError>;
}

#[derive(Clone)]
pub struct Cancel {
    pub user_id: i64,
}

impl Message for Cancel {
    type Response = Result<(), SchedulerError>;
}

#[derive(Clone)]
pub struct Restore {
    pub now: DateTime<Utc>,
}

impl Message for Restore {
    type Response = Result<usize, SchedulerError>;
}

#[derive(Clone)]
pub struct Housekeep {
    pub now: DateTime<Utc>,
}

impl Message for Housekeep {
    type Response = Result<u64, SchedulerError>;
}

/// Internal: delivered by a reminder's own sleep task when it elapses.
#[derive(Clone)]
pub(crate) struct Fire {
    pub reminder_id: i64,
    pub user_id: i64,
    pub station_id: String,
    pub lang: Lang,
}

impl Message for Fire {
    type Response = ();
}
