use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed travel cost of one adjacency hop between consecutive stations on
/// the same line, in minutes.
pub const HOP_MINUTES: i64 = 2;

/// Fixed travel cost of a transfer walk between two stations that share a
/// physical interchange, in minutes.
pub const TRANSFER_MINUTES: i64 = 3;

/// One hop of a produced itinerary: either a single adjacency traversal or
/// one transfer walk (spec §3).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub from_station: String,
    pub to_station: String,
    pub departure_time: Option<DateTime<FixedOffset>>,
    pub arrival_time: Option<DateTime<FixedOffset>>,
    pub is_transfer: bool,
    pub duration_minutes: i64,
}

/// A complete timed itinerary: an ordered sequence of segments plus
/// aggregates (spec §3).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub segments: Vec<RouteSegment>,
    pub departure_time: Option<DateTime<FixedOffset>>,
    pub arrival_time: Option<DateTime<FixedOffset>>,
    pub total_duration_minutes: i64,
    pub num_transfers: usize,
}

impl Route {
    /// Builds the aggregate fields from a finished segment list. `total`
    /// prefers wall-clock duration between the first departure and the
    /// last arrival when both exist, falling back to the sum of per-segment
    /// durations (spec §3).
    pub fn from_segments(segments: Vec<RouteSegment>) -> Self {
        let departure_time = segments.first().and_then(|s| s.departure_time);
        let arrival_time = segments.last().and_then(|s| s.arrival_time);
        let num_transfers = segments.iter().filter(|s| s.is_transfer).count();

        let total_duration_minutes = match (departure_time, arrival_time) {
            (Some(dep), Some(arr)) => (arr - dep).num_seconds() / 60,
            _ => segments.iter().map(|s| s.duration_minutes).sum(),
        };

        Self {
            segments,
            departure_time,
            arrival_time,
            total_duration_minutes,
            num_transfers,
        }
    }
}
