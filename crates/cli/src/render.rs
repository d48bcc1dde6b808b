use model::{DayType, Lang, Line, Route, Station, StationSchedule};
use network::Network;

fn station_name(network: &Network, id: &str, lang: Lang) -> String {
    network
        .station(id)
        .map(|s| s.name.get(lang).to_string())
        .unwrap_or_else(|| id.to_string())
}

fn transfers_label(count: usize, lang: Lang) -> String {
    match (lang, count) {
        (Lang::Ua, 0) => "без пересадок".to_string(),
        (Lang::Ua, 1) => "1 пересадка".to_string(),
        (Lang::Ua, n) => format!("{n} пересадки"),
        (Lang::En, 0) => "no transfers".to_string(),
        (Lang::En, 1) => "1 transfer".to_string(),
        (Lang::En, n) => format!("{n} transfers"),
    }
}

fn min_label(lang: Lang) -> &'static str {
    match lang {
        Lang::Ua => "хв",
        Lang::En => "min",
    }
}

fn route_header(route: &Route, lang: Lang) -> String {
    let total = route.total_duration_minutes;
    let transfers = transfers_label(route.num_transfers, lang);
    let min = min_label(lang);
    match (route.departure_time, route.arrival_time) {
        (Some(dep), Some(arr)) => format!(
            "{} → {} | {total} {min}, {transfers}",
            dep.format("%H:%M"),
            arr.format("%H:%M")
        ),
        _ => format!("{total} {min}, {transfers}"),
    }
}

/// Line-group rows for the `--compact` table/simple views: consecutive
/// same-line segments collapse into a single row (grounded on the same
/// boundary rule as `conversation::fingerprint::line_groups`, plus the
/// transfer rows that rule treats as boundaries rather than members).
struct DisplaySegment {
    from: String,
    to: String,
    line_label: String,
    time: String,
    is_transfer: bool,
}

fn grouped_segments(route: &Route, network: &Network, lang: Lang) -> Vec<DisplaySegment> {
    let min = min_label(lang);
    let mut rows = Vec::new();
    let mut i = 0;
    while i < route.segments.len() {
        let seg = &route.segments[i];
        if seg.is_transfer {
            rows.push(DisplaySegment {
                from: station_name(network, &seg.from_station, lang),
                to: station_name(network, &seg.to_station, lang),
                line_label: transfer_label(lang),
                time: format!("{} {min}", seg.duration_minutes),
                is_transfer: true,
            });
            i += 1;
            continue;
        }
        let line = network.station(&seg.from_station).map(|s| s.line).unwrap_or(Line::Red);
        let from_name = station_name(network, &seg.from_station, lang);
        let mut to_name = station_name(network, &seg.to_station, lang);
        let dep = seg.departure_time;
        let mut arr = seg.arrival_time;
        let mut total = seg.duration_minutes;
        i += 1;
        while i < route.segments.len() && !route.segments[i].is_transfer {
            let next = &route.segments[i];
            to_name = station_name(network, &next.to_station, lang);
            arr = next.arrival_time;
            total += next.duration_minutes;
            i += 1;
        }
        let time = match (dep, arr) {
            (Some(d), Some(a)) => format!("{} → {} | {total} {min}", d.format("%H:%M"), a.format("%H:%M")),
            _ => format!("{total} {min}"),
        };
        rows.push(DisplaySegment {
            from: from_name,
            to: to_name,
            line_label: line_label(network, line, lang),
            time,
            is_transfer: false,
        });
    }
    rows
}

fn ungrouped_segments(route: &Route, network: &Network, lang: Lang) -> Vec<DisplaySegment> {
    let min = min_label(lang);
    route
        .segments
        .iter()
        .map(|seg| {
            let time = match (seg.departure_time, seg.arrival_time) {
                (Some(d), Some(a)) => format!("{} → {} | {} {min}", d.format("%H:%M"), a.format("%H:%M"), seg.duration_minutes),
                _ => format!("{} {min}", seg.duration_minutes),
            };
            let line_label = if seg.is_transfer {
                transfer_label(lang)
            } else {
                let line = network.station(&seg.from_station).map(|s| s.line).unwrap_or(Line::Red);
                line_label(network, line, lang)
            };
            DisplaySegment {
                from: station_name(network, &seg.from_station, lang),
                to: station_name(network, &seg.to_station, lang),
                line_label,
                time,
                is_transfer: seg.is_transfer,
            }
        })
        .collect()
}

fn transfer_label(lang: Lang) -> String {
    match lang {
        Lang::Ua => "пересадка".to_string(),
        Lang::En => "Transfer".to_string(),
    }
}

fn line_label(network: &Network, line: Line, lang: Lang) -> String {
    network
        .line_meta(line)
        .map(|m| m.name.get(lang).to_string())
        .unwrap_or_else(|| line.key().to_string())
}

/// `--format full`: a plain aligned table, one row per segment (or per
/// line-group with `--compact`).
pub fn format_route_full(route: &Route, network: &Network, lang: Lang, compact: bool) -> String {
    if route.segments.is_empty() {
        return route_header(route, lang);
    }
    let rows = if compact {
        grouped_segments(route, network, lang)
    } else {
        ungrouped_segments(route, network, lang)
    };

    let from_col = match lang {
        Lang::Ua => "Звідки",
        Lang::En => "From",
    };
    let to_col = match lang {
        Lang::Ua => "Куди",
        Lang::En => "To",
    };
    let line_col = match lang {
        Lang::Ua => "Лінія",
        Lang::En => "Line",
    };
    let time_col = match lang {
        Lang::Ua => "Час",
        Lang::En => "Time",
    };

    let from_w = rows.iter().map(|r| r.from.chars().count()).chain([from_col.chars().count()]).max().unwrap_or(0);
    let to_w = rows.iter().map(|r| r.to.chars().count()).chain([to_col.chars().count()]).max().unwrap_or(0);
    let line_w = rows.iter().map(|r| r.line_label.chars().count()).chain([line_col.chars().count()]).max().unwrap_or(0);

    let mut out = vec![route_header(route, lang), String::new()];
    out.push(format!("{from_col:from_w$}  {to_col:to_w$}  {line_col:line_w$}  {time_col}"));
    for row in &rows {
        let marker = if row.is_transfer { "*" } else { " " };
        out.push(format!("{:from_w$}  {:to_w$}  {:line_w$}  {}{marker}", row.from, row.to, row.line_label, row.time));
    }
    out.join("\n")
}

/// `--format simple`: one header line plus a single arrow-joined path
/// string, with `⇌` marking transfer hops.
pub fn format_route_simple(route: &Route, network: &Network, lang: Lang, compact: bool) -> String {
    if route.segments.is_empty() {
        return route_header(route, lang);
    }
    let path = if compact {
        build_compact_path(route, network, lang)
    } else {
        build_full_path(route, network, lang)
    };
    format!("{}\n{}", route_header(route, lang), path)
}

fn build_full_path(route: &Route, network: &Network, lang: Lang) -> String {
    let first = station_name(network, &route.segments[0].from_station, lang);
    let mut path = first.clone();
    let mut seen = std::collections::HashSet::new();
    seen.insert(first);
    for seg in &route.segments {
        let to_name = station_name(network, &seg.to_station, lang);
        if seen.contains(&to_name) {
            continue;
        }
        if seg.is_transfer {
            path.push_str(&format!(" ⇌ {to_name}"));
        } else {
            path.push_str(&format!(" → {to_name}"));
        }
        seen.insert(to_name);
    }
    path
}

fn build_compact_path(route: &Route, network: &Network, lang: Lang) -> String {
    let first = station_name(network, &route.segments[0].from_station, lang);
    let mut path = first;
    for seg in &route.segments {
        if seg.is_transfer {
            let from_name = station_name(network, &seg.from_station, lang);
            let to_name = station_name(network, &seg.to_station, lang);
            path.push_str(&format!(" → {from_name} ⇌ {to_name}"));
        }
    }
    let last = route.segments.last().unwrap();
    if !last.is_transfer {
        path.push_str(&format!(" → {}", station_name(network, &last.to_station, lang)));
    }
    path
}

pub fn format_route_json(route: &Route) -> String {
    serde_json::to_string_pretty(route).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_stations_table(stations: &[Station], lang: Lang) -> String {
    if stations.is_empty() {
        return String::new();
    }
    let name_w = stations.iter().map(|s| s.name.get(lang).chars().count()).max().unwrap_or(0);
    let mut out = Vec::new();
    for station in stations {
        out.push(format!("{:name_w$}  {}  #{}", station.name.get(lang), station.line.key(), station.order));
    }
    out.join("\n")
}

pub fn format_stations_json(stations: &[Station]) -> String {
    serde_json::to_string_pretty(stations).unwrap_or_else(|_| "[]".to_string())
}

pub fn format_schedule_table(station_id: &str, schedules: &[StationSchedule], network: &Network, lang: Lang) -> String {
    let mut out = vec![station_name(network, station_id, lang)];
    for schedule in schedules {
        let terminal = station_name(network, &schedule.direction_terminal_id, lang);
        let day_label = match (lang, schedule.day_type) {
            (Lang::Ua, DayType::Weekday) => "будній",
            (Lang::Ua, DayType::Weekend) => "вихідний",
            (Lang::En, DayType::Weekday) => "weekday",
            (Lang::En, DayType::Weekend) => "weekend",
        };
        out.push(format!("→ {terminal} ({day_label}):"));
        let times: Vec<String> = schedule.entries.iter().map(|e| format!("{:02}:{:02}", e.hour, e.minute)).collect();
        out.push(if times.is_empty() { "(no departures on file)".to_string() } else { times.join(", ") });
    }
    out.join("\n")
}

pub fn format_schedule_json(schedules: &[StationSchedule]) -> String {
    serde_json::to_string_pretty(schedules).unwrap_or_else(|_| "[]".to_string())
}

pub fn error_json(message: &str) -> String {
    serde_json::json!({ "status": "error", "message": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::RouteSegment;

    fn two_hop_route() -> Route {
        Route::from_segments(vec![
            RouteSegment {
                from_station: "kholodna_hora".to_string(),
                to_station: "vokzalna".to_string(),
                departure_time: None,
                arrival_time: None,
                is_transfer: false,
                duration_minutes: model::HOP_MINUTES,
            },
            RouteSegment {
                from_station: "vokzalna".to_string(),
                to_station: "tsentralnyi_rynok".to_string(),
                departure_time: None,
                arrival_time: None,
                is_transfer: false,
                duration_minutes: model::HOP_MINUTES,
            },
        ])
    }

    #[test]
    fn simple_path_names_every_station_once() {
        let network = network::load_bundled().unwrap();
        let route = two_hop_route();
        let path = build_full_path(&route, &network, Lang::En);
        assert_eq!(path, "Kholodna Hora → Vokzalna → Tsentralnyi Rynok");
    }

    #[test]
    fn grouped_segments_collapse_same_line_run_into_one_row() {
        let network = network::load_bundled().unwrap();
        let route = two_hop_route();
        let rows = grouped_segments(&route, &network, Lang::Ua);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].from, "Холодна Гора");
        assert_eq!(rows[0].to, "Центральний ринок");
        assert!(!rows[0].is_transfer);
    }

    #[test]
    fn transfers_label_pluralizes_ukrainian_counts() {
        assert_eq!(transfers_label(0, Lang::Ua), "без пересадок");
        assert_eq!(transfers_label(1, Lang::Ua), "1 пересадка");
        assert_eq!(transfers_label(2, Lang::Ua), "2 пересадки");
    }

    #[test]
    fn route_header_reports_total_minutes_and_transfer_count() {
        let route = two_hop_route();
        let header = route_header(&route, Lang::En);
        assert!(header.contains(&format!("{} min", route.total_duration_minutes)));
        assert!(header.contains("no transfers"));
    }
}
