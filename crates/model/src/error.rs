use thiserror::Error;

/// Error kinds shared by every layer of the routing engine (spec §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetroError {
    /// No service at the requested time, or the last train is unreachable at
    /// some intermediate hop.
    #[error("the metro is closed at the requested time")]
    MetroClosed,

    /// A station name (or alias) did not resolve.
    #[error("unknown station: {0}")]
    UnknownStation(String),

    /// The graph has no path between two known stations. Unreachable on the
    /// current topology, retained for future growth.
    #[error("no route between the requested stations")]
    NoRoute,

    /// Malformed time, or an unrecognised menu choice.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The persistent store is missing when required (CLI only; the bot
    /// auto-initializes it).
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A callback payload referenced a route fingerprint no longer held in
    /// memory.
    #[error("route expired")]
    ExpiredCallback,
}
