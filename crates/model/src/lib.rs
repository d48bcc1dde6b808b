pub mod error;
pub mod lang;
pub mod line;
pub mod reminder;
pub mod route;
pub mod schedule;
pub mod session;
pub mod station;
pub mod usage;

pub use error::MetroError;
pub use lang::Lang;
pub use line::{Line, LineMeta, LocalizedText};
pub use reminder::Reminder;
pub use route::{Route, RouteSegment, HOP_MINUTES, TRANSFER_MINUTES};
pub use schedule::{DayType, DayTypeMeta, ScheduleEntry, StationSchedule};
pub use session::{SessionKey, SessionKeyDto, SessionRecord};
pub use station::Station;
pub use usage::{UsageEvent, UserUsage};
