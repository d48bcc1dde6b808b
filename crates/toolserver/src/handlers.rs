use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use model::{DayType, Lang, Line, MetroError};

use crate::dto::{FindStationParams, GetRouteParams, GetScheduleParams, ListStationsParams, ToolResponse};
use crate::error::{ToolError, ToolResult};
use crate::state::AppState;

fn parse_lang(code: &str) -> ToolResult<Lang> {
    Lang::from_code(code).ok_or_else(|| MetroError::InvalidInput(format!("unknown language: {code}")).into())
}

fn parse_day_type(key: &str) -> ToolResult<DayType> {
    DayType::from_key(key).ok_or_else(|| MetroError::InvalidInput(format!("unknown day type: {key}")).into())
}

/// Resolves a `time`/`date` pair against `tz_name` into an absolute instant,
/// defaulting to "now" when both are absent. Mirrors the CLI's `route`
/// command resolution (`cli::main::resolve_departure`), reimplemented here
/// since the two binaries share no common dependency on each other.
fn resolve_departure(time: Option<String>, date: Option<String>, tz_name: &str) -> ToolResult<DateTime<FixedOffset>> {
    let tz: chrono_tz::Tz = tz_name.parse().map_err(|_| MetroError::InvalidInput(format!("unknown timezone: {tz_name}")))?;

    if time.is_none() && date.is_none() {
        return Ok(Utc::now().with_timezone(&tz).fixed_offset());
    }

    let now_in_tz = Utc::now().with_timezone(&tz);
    let date = match date {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|_| MetroError::InvalidInput(format!("invalid date (expected YYYY-MM-DD): {d}")))?,
        None => now_in_tz.date_naive(),
    };
    let (hour, minute) = match time {
        Some(t) => conversation::validation::parse_custom_time(&t)?,
        None => (now_in_tz.time().hour() as u8, now_in_tz.time().minute() as u8),
    };
    let naive_time = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)
        .ok_or_else(|| MetroError::InvalidInput(format!("invalid time: {hour}:{minute}")))?;
    let naive = date.and_time(naive_time);
    let local = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| MetroError::InvalidInput("ambiguous or invalid local time".to_string()))?;
    Ok(local.fixed_offset())
}

pub async fn get_route(State(state): State<AppState>, Query(params): Query<GetRouteParams>) -> ToolResult<Json<ToolResponse<model::Route>>> {
    let lang = parse_lang(&params.lang)?;
    let day_type = params.day_type.map(|d| parse_day_type(&d)).transpose()?;

    let from = state.network.find_station(&params.from, lang).ok_or_else(|| MetroError::UnknownStation(params.from.clone()))?;
    let to = state.network.find_station(&params.to, lang).ok_or_else(|| MetroError::UnknownStation(params.to.clone()))?;

    let departure = resolve_departure(params.time, params.date, &state.tz)?;

    let route = state.router.route_depart_at(&from.id, &to.id, departure, day_type).await?;

    let from_name = from.name.get(lang);
    let to_name = to.name.get(lang);
    let text = match lang {
        Lang::Ua => format!(
            "{from_name} → {to_name}: {} хв, пересадок: {}",
            route.total_duration_minutes, route.num_transfers
        ),
        Lang::En => format!(
            "{from_name} → {to_name}: {} min, {} transfers",
            route.total_duration_minutes, route.num_transfers
        ),
    };
    Ok(Json(ToolResponse::ok(text, route)))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Query(params): Query<GetScheduleParams>,
) -> ToolResult<Json<ToolResponse<Vec<model::StationSchedule>>>> {
    let lang = parse_lang(&params.lang)?;
    let day_type = params.day_type.map(|d| parse_day_type(&d)).transpose()?.unwrap_or_else(|| DayType::for_date(Utc::now()));

    let station = state.network.find_station(&params.station, lang).ok_or_else(|| MetroError::UnknownStation(params.station.clone()))?;

    let store = store::Store::open(&state.metro_db_path).await?;

    let schedules = match params.direction {
        Some(direction) => {
            let terminal = state.network.find_station(&direction, lang).ok_or_else(|| MetroError::UnknownStation(direction.clone()))?;
            let entries = store::schedules::get_schedule(store.pool(), &station.id, &terminal.id, day_type).await?;
            vec![model::StationSchedule {
                station_id: station.id.clone(),
                direction_terminal_id: terminal.id.clone(),
                day_type,
                entries,
            }]
        }
        None => store::schedules::get_all_schedules_for_station(store.pool(), &station.id, day_type).await?,
    };

    let text = match lang {
        Lang::Ua => format!("Розклад для {}: {} напрямків", station.name.get(lang), schedules.len()),
        Lang::En => format!("Schedule for {}: {} direction(s)", station.name.get(lang), schedules.len()),
    };
    Ok(Json(ToolResponse::ok(text, schedules)))
}

pub async fn list_stations(
    State(state): State<AppState>,
    Query(params): Query<ListStationsParams>,
) -> ToolResult<Json<ToolResponse<Vec<model::Station>>>> {
    let lang = parse_lang(&params.lang)?;
    let line = params.line.map(|l| Line::from_key(&l.to_uppercase()).ok_or_else(|| MetroError::InvalidInput(format!("unknown line: {l}")))).transpose()?;

    let mut stations: Vec<model::Station> = match line {
        Some(line) => state.network.stations_on_line(line).iter().filter_map(|id| state.network.station(id).cloned()).collect(),
        None => state.network.stations().cloned().collect(),
    };
    stations.sort_by_key(|s| (s.line.key().to_string(), s.order));

    let text = match lang {
        Lang::Ua => format!("{} станцій", stations.len()),
        Lang::En => format!("{} stations", stations.len()),
    };
    Ok(Json(ToolResponse::ok(text, stations)))
}

pub async fn find_station(
    State(state): State<AppState>,
    Query(params): Query<FindStationParams>,
) -> ToolResult<Json<ToolResponse<model::Station>>> {
    let lang = parse_lang(&params.lang)?;
    let station = state.network.find_station(&params.query, lang).ok_or_else(|| MetroError::UnknownStation(params.query.clone()))?.clone();
    let text = station.name.get(lang).to_string();
    Ok(Json(ToolResponse::ok(text, station)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lang_accepts_known_codes_only() {
        assert!(parse_lang("ua").is_ok());
        assert!(parse_lang("en").is_ok());
        assert!(parse_lang("fr").is_err());
    }

    #[test]
    fn parse_day_type_accepts_known_keys_only() {
        assert!(parse_day_type("weekday").is_ok());
        assert!(parse_day_type("weekend").is_ok());
        assert!(parse_day_type("someday").is_err());
    }

    #[test]
    fn resolve_departure_defaults_to_now_when_both_absent() {
        let resolved = resolve_departure(None, None, "Europe/Kyiv");
        assert!(resolved.is_ok());
    }

    #[test]
    fn resolve_departure_rejects_an_unknown_timezone() {
        let resolved = resolve_departure(Some("08:30".to_string()), None, "Not/AZone");
        assert!(resolved.is_err());
    }

    #[test]
    fn resolve_departure_rejects_a_malformed_date() {
        let resolved = resolve_departure(Some("08:30".to_string()), Some("30-02-2026".to_string()), "Europe/Kyiv");
        assert!(resolved.is_err());
    }

    #[test]
    fn resolve_departure_combines_explicit_time_and_date() {
        let resolved = resolve_departure(Some("08:30".to_string()), Some("2026-07-28".to_string()), "Europe/Kyiv").unwrap();
        assert_eq!(resolved.format("%H:%M").to_string(), "08:30");
    }
}
