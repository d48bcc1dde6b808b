use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use md5::{Digest, Md5};
use model::Route;

/// How many hops a contiguous same-line run of a route covers, and where it
/// ends. A reminder offer is only shown for groups with more than one hop
/// (spec §4.G): a single hop is already "get off at the next station".
#[derive(Debug, Clone)]
pub struct LineGroup {
    pub first_segment: usize,
    pub last_segment: usize,
    pub hop_count: usize,
    pub exit_station_id: String,
    pub departure_time: Option<DateTime<FixedOffset>>,
    pub arrival_time: Option<DateTime<FixedOffset>>,
}

/// Splits a route's segments into maximal runs of consecutive non-transfer
/// segments. Transfer segments are boundaries, not members of any group.
pub fn line_groups(route: &Route) -> Vec<LineGroup> {
    let mut groups = Vec::new();
    let mut run_start: Option<usize> = None;

    for (index, segment) in route.segments.iter().enumerate() {
        if segment.is_transfer {
            if let Some(start) = run_start.take() {
                groups.push(build_group(route, start, index - 1));
            }
            continue;
        }
        if run_start.is_none() {
            run_start = Some(index);
        }
    }
    if let Some(start) = run_start {
        groups.push(build_group(route, start, route.segments.len() - 1));
    }
    groups
}

fn build_group(route: &Route, first_segment: usize, last_segment: usize) -> LineGroup {
    let last = &route.segments[last_segment];
    LineGroup {
        first_segment,
        last_segment,
        hop_count: last_segment - first_segment + 1,
        exit_station_id: last.to_station.clone(),
        departure_time: route.segments[first_segment].departure_time,
        arrival_time: last.arrival_time,
    }
}

/// 12-hex-digit prefix of the MD5 of `(from_id, to_id, departure_epoch_seconds)`
/// (spec §4.G).
pub fn route_fingerprint(from_id: &str, to_id: &str, departure_epoch_seconds: i64) -> String {
    let mut hasher = Md5::new();
    hasher.update(from_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(to_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(departure_epoch_seconds.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    hex[..12].to_string()
}

/// Default cap on how many routes the process-wide in-memory map remembers
/// before evicting the oldest (spec §4.G: "process-wide in-memory map from
/// fingerprint to (route, line_groups)").
const DEFAULT_CAPACITY: usize = 4096;

/// Bounded fingerprint -> (route, line groups) cache backing reminder
/// offers. FIFO eviction via `IndexMap`'s insertion order once `capacity`
/// is exceeded.
pub struct RouteCache {
    capacity: usize,
    entries: IndexMap<String, (Route, Vec<LineGroup>)>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::new(),
        }
    }

    /// Computes the fingerprint from the route's first departure and
    /// endpoints, stores the route alongside its line groups, and returns
    /// the fingerprint.
    pub fn insert(&mut self, from_id: &str, to_id: &str, route: Route) -> Option<String> {
        let departure_epoch = route.departure_time?.timestamp();
        let fingerprint = route_fingerprint(from_id, to_id, departure_epoch);
        let groups = line_groups(&route);

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&fingerprint) {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(fingerprint.clone(), (route, groups));
        Some(fingerprint)
    }

    pub fn get(&self, fingerprint: &str) -> Option<&(Route, Vec<LineGroup>)> {
        self.entries.get(fingerprint)
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the compact `remind|<fp12>|<group_idx>|<epoch>` callback payload
/// (spec §6). `epoch` is the reminder's target fire time.
pub fn encode_remind_payload(fingerprint: &str, group_index: usize, remind_at_epoch: i64) -> String {
    format!("remind|{fingerprint}|{group_index}|{remind_at_epoch}")
}

pub fn encode_remind_cancel_payload(fingerprint: &str, group_index: usize) -> String {
    format!("remind_cancel|{fingerprint}|{group_index}")
}

/// Parses a `remind|...`/`remind_cancel|...` callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemindCallback {
    Arm { fingerprint: String, group_index: usize, remind_at_epoch: i64 },
    Cancel { fingerprint: String, group_index: usize },
}

pub fn parse_remind_payload(payload: &str) -> Option<RemindCallback> {
    let mut parts = payload.split('|');
    match parts.next()? {
        "remind" => {
            let fingerprint = parts.next()?.to_string();
            let group_index: usize = parts.next()?.parse().ok()?;
            let remind_at_epoch: i64 = parts.next()?.parse().ok()?;
            Some(RemindCallback::Arm {
                fingerprint,
                group_index,
                remind_at_epoch,
            })
        }
        "remind_cancel" => {
            let fingerprint = parts.next()?.to_string();
            let group_index: usize = parts.next()?.parse().ok()?;
            Some(RemindCallback::Cancel {
                fingerprint,
                group_index,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::RouteSegment;
    use chrono::TimeZone;

    fn sample_route() -> Route {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = |h: u32, m: u32| tz.with_ymd_and_hms(2026, 7, 27, h, m, 0).unwrap();
        Route::from_segments(vec![
            RouteSegment {
                from_station: "a".into(),
                to_station: "b".into(),
                departure_time: Some(t(8, 0)),
                arrival_time: Some(t(8, 2)),
                is_transfer: false,
                duration_minutes: 2,
            },
            RouteSegment {
                from_station: "b".into(),
                to_station: "c".into(),
                departure_time: Some(t(8, 2)),
                arrival_time: Some(t(8, 4)),
                is_transfer: false,
                duration_minutes: 2,
            },
            RouteSegment {
                from_station: "c".into(),
                to_station: "d".into(),
                departure_time: Some(t(8, 4)),
                arrival_time: Some(t(8, 7)),
                is_transfer: true,
                duration_minutes: 3,
            },
            RouteSegment {
                from_station: "d".into(),
                to_station: "e".into(),
                departure_time: Some(t(8, 7)),
                arrival_time: Some(t(8, 9)),
                is_transfer: false,
                duration_minutes: 2,
            },
        ])
    }

    #[test]
    fn line_groups_splits_on_transfers_and_counts_hops() {
        let route = sample_route();
        let groups = line_groups(&route);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].hop_count, 2);
        assert_eq!(groups[0].exit_station_id, "c");
        assert_eq!(groups[1].hop_count, 1);
        assert_eq!(groups[1].exit_station_id, "e");
    }

    #[test]
    fn fingerprint_is_twelve_hex_digits_and_deterministic() {
        let a = route_fingerprint("kholodna_hora", "industrialna", 1_800_000_000);
        let b = route_fingerprint("kholodna_hora", "industrialna", 1_800_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_roundtrips_and_unknown_fingerprint_misses() {
        let mut cache = RouteCache::new();
        let fp = cache.insert("a", "e", sample_route()).unwrap();
        assert!(cache.get(&fp).is_some());
        assert!(cache.get("0000000000ff").is_none());
    }

    #[test]
    fn remind_payload_round_trips() {
        let payload = encode_remind_payload("abc123def456", 1, 1_800_000_000);
        assert!(payload.len() <= 64);
        assert_eq!(
            parse_remind_payload(&payload),
            Some(RemindCallback::Arm {
                fingerprint: "abc123def456".to_string(),
                group_index: 1,
                remind_at_epoch: 1_800_000_000,
            })
        );

        let cancel = encode_remind_cancel_payload("abc123def456", 1);
        assert_eq!(
            parse_remind_payload(&cancel),
            Some(RemindCallback::Cancel {
                fingerprint: "abc123def456".to_string(),
                group_index: 1,
            })
        );
    }
}
