pub mod cache;
pub mod error;
pub mod terminals;

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use graph::Graph;
use model::{DayType, MetroError, Route, RouteSegment, ScheduleEntry, HOP_MINUTES, TRANSFER_MINUTES};
use network::Network;
use store::Store;

pub use error::RouterResult;
use terminals::LineTerminals;
use utility::time::{clock_of, combine_with_clock, roll_forward_if_before};

/// Default early-service window used by `is_metro_open` (spec §4.B).
pub const EARLY_WINDOW_MINUTES: i64 = 90;

/// How many boarding candidates the arrive-by search tries per segment
/// before falling back to a placeholder hop (spec §4.D).
const ARRIVE_BY_SEARCH_WINDOW: u32 = 5;

/// Schedule-aware trip construction over the graph and timetable store
/// (spec §4.D). Holds the process-wide singletons it needs and a memo of
/// its own; safe to share behind an `Arc` across concurrent callers.
pub struct Router {
    network: Arc<Network>,
    graph: Arc<Graph>,
    store: Store,
    terminals: LineTerminals,
    memo: cache::ScheduleMemo,
}

fn store_err(err: store::StoreError) -> MetroError {
    MetroError::StoreUnavailable(err.to_string())
}

impl Router {
    pub fn new(network: Arc<Network>, graph: Arc<Graph>, store: Store) -> Self {
        let terminals = LineTerminals::build(&network);
        Self {
            network,
            graph,
            store,
            terminals,
            memo: cache::ScheduleMemo::new(),
        }
    }

    fn station_or_err<'a>(&'a self, id: &str) -> RouterResult<&'a model::Station> {
        self.network
            .station(id)
            .ok_or_else(|| MetroError::UnknownStation(id.to_string()))
    }

    async fn is_open(
        &self,
        day_type: DayType,
        t: ScheduleEntry,
        early_window_minutes: i64,
    ) -> RouterResult<bool> {
        let (open, _, _) = store::schedules::is_metro_open(
            self.store.pool(),
            day_type,
            t,
            early_window_minutes,
        )
        .await
        .map_err(store_err)?;
        Ok(open)
    }

    fn direction_for_edge(
        &self,
        from: &model::Station,
        to: &model::Station,
    ) -> Option<String> {
        if to.order > from.order {
            self.terminals.last(from.line).map(|s| s.to_string())
        } else {
            self.terminals.first(from.line).map(|s| s.to_string())
        }
    }

    async fn next_departure_at(
        &self,
        station_id: &str,
        direction: &str,
        day_type: DayType,
        after: ScheduleEntry,
    ) -> RouterResult<Option<ScheduleEntry>> {
        let store = &self.store;
        let entries = self
            .memo
            .get_next_or_insert_with(station_id, direction, day_type, after, 1, || async move {
                store::schedules::get_next_departures(
                    store.pool(),
                    station_id,
                    direction,
                    day_type,
                    after,
                    1,
                )
                .await
                .map_err(store_err)
            })
            .await?;
        Ok(entries.into_iter().next())
    }

    async fn previous_departures_at(
        &self,
        station_id: &str,
        direction: &str,
        day_type: DayType,
        before: ScheduleEntry,
        limit: u32,
    ) -> RouterResult<Vec<ScheduleEntry>> {
        let store = &self.store;
        self.memo
            .get_previous_or_insert_with(station_id, direction, day_type, before, limit, || async move {
                store::schedules::get_previous_departures(
                    store.pool(),
                    station_id,
                    direction,
                    day_type,
                    before,
                    limit,
                )
                .await
                .map_err(store_err)
            })
            .await
    }

    /// Depart-at contract (spec §4.D).
    pub async fn route_depart_at(
        &self,
        from_id: &str,
        to_id: &str,
        desired_departure: DateTime<FixedOffset>,
        day_type: Option<DayType>,
    ) -> RouterResult<Route> {
        self.station_or_err(from_id)?;
        self.station_or_err(to_id)?;

        let day_type = day_type.unwrap_or_else(|| DayType::for_date(desired_departure));
        let (h, m) = clock_of(&desired_departure);
        if !self
            .is_open(day_type, ScheduleEntry::new(h as u8, m as u8), EARLY_WINDOW_MINUTES)
            .await?
        {
            return Err(MetroError::MetroClosed);
        }

        let (path, _) = self
            .graph
            .shortest_path(from_id, to_id)
            .ok_or(MetroError::NoRoute)?;

        let mut segments = Vec::new();
        let mut current_time = desired_departure;
        let mut current_line: Option<model::Line> = None;
        let mut current_direction: Option<String> = None;

        for window in path.windows(2) {
            let from = self.station_or_err(&window[0].station_id)?.clone();
            let to = self.station_or_err(&window[1].station_id)?.clone();
            let is_transfer = window[1].is_transfer;

            if is_transfer {
                let departure = current_time;
                let arrival = departure + Duration::minutes(TRANSFER_MINUTES);
                segments.push(RouteSegment {
                    from_station: from.id.clone(),
                    to_station: to.id.clone(),
                    departure_time: Some(departure),
                    arrival_time: Some(arrival),
                    is_transfer: true,
                    duration_minutes: TRANSFER_MINUTES,
                });
                current_time = arrival;
                current_line = None;
                current_direction = None;
                continue;
            }

            if current_line != Some(from.line) {
                current_direction = self.direction_for_edge(&from, &to);
                current_line = Some(from.line);
            }
            let direction = current_direction
                .clone()
                .ok_or_else(|| MetroError::NoRoute)?;

            let (ch, cm) = clock_of(&current_time);
            let departure_entry = self
                .next_departure_at(&from.id, &direction, day_type, ScheduleEntry::new(ch as u8, cm as u8))
                .await?
                .ok_or(MetroError::MetroClosed)?;

            let departure =
                roll_forward_if_before(combine_with_clock(&current_time, departure_entry.hour as u32, departure_entry.minute as u32), &current_time);

            let arrival_entry = self
                .next_departure_at(&to.id, &direction, day_type, departure_entry)
                .await?;

            let arrival = match arrival_entry {
                Some(entry) => roll_forward_if_before(
                    combine_with_clock(&departure, entry.hour as u32, entry.minute as u32),
                    &departure,
                ),
                None => departure + Duration::minutes(HOP_MINUTES),
            };

            let duration_minutes = (arrival - departure).num_seconds() / 60;
            segments.push(RouteSegment {
                from_station: from.id.clone(),
                to_station: to.id.clone(),
                departure_time: Some(departure),
                arrival_time: Some(arrival),
                is_transfer: false,
                duration_minutes,
            });
            current_time = arrival;
        }

        if let Some(last) = segments.last() {
            if let Some(arrival) = last.arrival_time {
                let (h, m) = clock_of(&arrival);
                if !self.is_open(day_type, ScheduleEntry::new(h as u8, m as u8), 0).await? {
                    return Err(MetroError::MetroClosed);
                }
            }
        }

        Ok(Route::from_segments(segments))
    }

    /// Arrive-by contract (spec §4.D): symmetric to depart-at, walking the
    /// path right-to-left and searching for the latest boarding that still
    /// lands on time.
    pub async fn route_arrive_by(
        &self,
        from_id: &str,
        to_id: &str,
        desired_arrival: DateTime<FixedOffset>,
        day_type: Option<DayType>,
    ) -> RouterResult<Route> {
        self.station_or_err(from_id)?;
        self.station_or_err(to_id)?;

        let day_type = day_type.unwrap_or_else(|| DayType::for_date(desired_arrival));
        let (h, m) = clock_of(&desired_arrival);
        if !self
            .is_open(day_type, ScheduleEntry::new(h as u8, m as u8), EARLY_WINDOW_MINUTES)
            .await?
        {
            return Err(MetroError::MetroClosed);
        }

        let (path, _) = self
            .graph
            .shortest_path(from_id, to_id)
            .ok_or(MetroError::NoRoute)?;

        let mut segments = Vec::new();
        let mut deadline = desired_arrival;
        let mut current_line: Option<model::Line> = None;
        let mut current_direction: Option<String> = None;

        for window in path.windows(2).rev() {
            let from = self.station_or_err(&window[0].station_id)?.clone();
            let to = self.station_or_err(&window[1].station_id)?.clone();
            let is_transfer = window[1].is_transfer;

            if is_transfer {
                let arrival = deadline;
                let departure = arrival - Duration::minutes(TRANSFER_MINUTES);
                segments.push(RouteSegment {
                    from_station: from.id.clone(),
                    to_station: to.id.clone(),
                    departure_time: Some(departure),
                    arrival_time: Some(arrival),
                    is_transfer: true,
                    duration_minutes: TRANSFER_MINUTES,
                });
                deadline = departure;
                current_line = None;
                current_direction = None;
                continue;
            }

            if current_line != Some(from.line) {
                current_direction = self.direction_for_edge(&from, &to);
                current_line = Some(from.line);
            }
            let direction = current_direction
                .clone()
                .ok_or_else(|| MetroError::NoRoute)?;

            let (dh, dm) = clock_of(&deadline);
            let candidates = self
                .previous_departures_at(
                    &from.id,
                    &direction,
                    day_type,
                    ScheduleEntry::new(dh as u8, dm as u8),
                    ARRIVE_BY_SEARCH_WINDOW,
                )
                .await?;

            let mut chosen = None;
            for candidate in &candidates {
                let mut candidate_departure = combine_with_clock(&deadline, candidate.hour as u32, candidate.minute as u32);
                if candidate_departure > deadline {
                    candidate_departure = candidate_departure - Duration::days(1);
                }

                let implied_arrival_entry = self
                    .next_departure_at(&to.id, &direction, day_type, *candidate)
                    .await?;
                let implied_arrival = match implied_arrival_entry {
                    Some(entry) => roll_forward_if_before(
                        combine_with_clock(&candidate_departure, entry.hour as u32, entry.minute as u32),
                        &candidate_departure,
                    ),
                    None => candidate_departure + Duration::minutes(HOP_MINUTES),
                };

                if implied_arrival <= deadline {
                    chosen = Some((candidate_departure, implied_arrival));
                    break;
                }
            }

            let (departure, arrival) = match chosen {
                Some(pair) => pair,
                None if candidates.is_empty() => (deadline - Duration::minutes(HOP_MINUTES), deadline),
                None => return Err(MetroError::NoRoute),
            };

            let duration_minutes = (arrival - departure).num_seconds() / 60;
            segments.push(RouteSegment {
                from_station: from.id.clone(),
                to_station: to.id.clone(),
                departure_time: Some(departure),
                arrival_time: Some(arrival),
                is_transfer: false,
                duration_minutes,
            });
            deadline = departure;
        }

        segments.reverse();
        Ok(Route::from_segments(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::SqlitePool;

    const SAMPLE_NETWORK: &str = r#"
[lines]
order = ["K", "S"]

[[lines.K.stations]]
id = "kholodna_hora"
name_ua = "Холодна гора"
name_en = "Kholodna Hora"

[[lines.K.stations]]
id = "zavod_imeni_malysheva"
name_ua = "Завод ім. Малишева"
name_en = "Zavod imeni Malysheva"

[[lines.K.stations]]
id = "industrialna"
name_ua = "Індустріальна"
name_en = "Industrialna"

[[lines.S.stations]]
id = "universytet"
name_ua = "Університет"
name_en = "Universytet"

[transfers]

[line_meta.K]
color = "#E4072F"
emoji = "🔴"
name_ua = "К"
name_en = "K"
display_ua = "Червона"
display_en = "Red"

[line_meta.S]
color = "#1C75BC"
emoji = "🔵"
name_ua = "С"
name_en = "S"
display_ua = "Синя"
display_en = "Blue"

[day_types.weekday]
emoji = "d"
name_ua = "будній"
name_en = "weekday"

[day_types.weekend]
emoji = "e"
name_ua = "вихідний"
name_en = "weekend"
"#;

    async fn sample_router() -> Router {
        let network = Arc::new(Network::load(SAMPLE_NETWORK).unwrap());
        let graph = Arc::new(Graph::build(&network));
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();

        let last_id = "industrialna".to_string();
        let schedule = model::StationSchedule {
            station_id: "kholodna_hora".to_string(),
            direction_terminal_id: last_id.clone(),
            day_type: DayType::Weekday,
            entries: vec![ScheduleEntry::new(6, 0), ScheduleEntry::new(6, 10)],
        };
        let mid_schedule = model::StationSchedule {
            station_id: "zavod_imeni_malysheva".to_string(),
            direction_terminal_id: last_id.clone(),
            day_type: DayType::Weekday,
            entries: vec![ScheduleEntry::new(6, 2), ScheduleEntry::new(6, 12)],
        };
        let end_schedule = model::StationSchedule {
            station_id: last_id.clone(),
            direction_terminal_id: last_id,
            day_type: DayType::Weekday,
            entries: vec![ScheduleEntry::new(6, 4), ScheduleEntry::new(6, 14)],
        };
        store::schedules::save_schedules(
            store.pool(),
            &[schedule, mid_schedule, end_schedule],
        )
        .await
        .unwrap();

        Router::new(network, graph, store)
    }

    #[test]
    fn depart_at_builds_all_same_line_segments() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let router = sample_router().await;
            let tz = FixedOffset::east_opt(2 * 3600).unwrap();
            let departure = tz.with_ymd_and_hms(2026, 7, 27, 6, 0, 0).unwrap();

            let route = router
                .route_depart_at("kholodna_hora", "industrialna", departure, Some(DayType::Weekday))
                .await
                .unwrap();

            assert_eq!(route.num_transfers, 0);
            assert!(route.segments.iter().all(|s| !s.is_transfer));
            assert_eq!(route.segments.len(), 2);
        });
    }

    #[test]
    fn depart_at_after_last_departure_is_metro_closed() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let router = sample_router().await;
            let tz = FixedOffset::east_opt(2 * 3600).unwrap();
            let too_late = tz.with_ymd_and_hms(2026, 7, 27, 6, 15, 0).unwrap();

            let result = router
                .route_depart_at("kholodna_hora", "industrialna", too_late, Some(DayType::Weekday))
                .await;

            assert!(matches!(result, Err(MetroError::MetroClosed)));
        });
    }
}
