use thiserror::Error;

/// Failures from fetching or parsing the upstream timetable pages. All
/// variants are per-station/per-page: a single failure is reported back to
/// the caller, which decides whether to keep going or abort the run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    BadStatus { url: String, status: reqwest::StatusCode },

    #[error("no direction heading found above a timetable table at {url}")]
    MissingDirectionHeading { url: String },

    #[error("direction name {name:?} at {url} does not match any known station")]
    UnknownDirection { url: String, name: String },

    #[error("could not find a station link for station id {0:?} on its line's listing page")]
    MissingStationLink(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
