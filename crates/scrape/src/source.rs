use async_trait::async_trait;
use model::StationSchedule;

use crate::error::Result;

/// External collaborator contract: something that can produce a fresh set
/// of timetables for the whole network. The bundled HTML scraper is the
/// only implementation today, but the CLI's `scrape` command talks to this
/// trait, not to `HtmlTimetableScraper` directly, so a fixture source can
/// stand in for it in tests.
#[async_trait]
pub trait TimetableSource: Send + Sync {
    async fn scrape_all(&self) -> Result<Vec<StationSchedule>>;
}
