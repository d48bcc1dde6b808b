use thiserror::Error;

/// Failures that can occur while loading the bundled data file. These are
/// all process-fatal: a malformed bundle means the binary cannot start.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bundled data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse bundled data file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("line {0:?} listed in lines.order has no station table")]
    MissingLineTable(String),

    #[error("transfer pair {0:?} -> {1:?} is not symmetric")]
    AsymmetricTransfer(String, String),

    #[error("transfer endpoint {0:?} is not a known station id")]
    UnknownTransferEndpoint(String),

    #[error("line_meta is missing an entry for line key {0:?}")]
    MissingLineMeta(String),

    #[error("day_types is missing an entry for {0:?}")]
    MissingDayType(String),

    #[error("duplicate station id {0:?}")]
    DuplicateStationId(String),
}
