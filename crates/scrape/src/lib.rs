//! Fetches the bundled timetable from the transit authority's own site
//! (spec §4: external collaborator). [`TimetableSource`] is the contract the
//! rest of the workspace depends on; [`HtmlTimetableScraper`] is the only
//! implementation, scraping `https://www.metro.kharkiv.ua` directly.

pub mod error;
pub mod html;
pub mod source;

pub use error::{Result, ScrapeError};
pub use html::HtmlTimetableScraper;
pub use source::TimetableSource;
