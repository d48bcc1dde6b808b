use serde::{Deserialize, Serialize};

/// A node of the conversation FSM (spec §4.G). Persisted in
/// `SessionRecord.state` as its string key so a session surviving a process
/// restart resumes in the same place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    MainMenu,

    // Route-planning flow: FromLine -> FromStation -> ToLine -> ToStation
    // -> TimeChoice -> {direct route | DayType -> CustomTime -> route}.
    RouteFromLine,
    RouteFromStation,
    RouteToLine,
    RouteToStation,
    RouteTimeChoice,
    RouteDayType,
    RouteCustomTime,

    // Schedule-lookup flow: Line -> Station -> DayType -> schedule.
    ScheduleLine,
    ScheduleStation,
    ScheduleDayType,

    // Stations-listing flow: Line -> list.
    StationsLine,
}

impl State {
    pub fn key(self) -> &'static str {
        match self {
            State::MainMenu => "main_menu",
            State::RouteFromLine => "route_from_line",
            State::RouteFromStation => "route_from_station",
            State::RouteToLine => "route_to_line",
            State::RouteToStation => "route_to_station",
            State::RouteTimeChoice => "route_time_choice",
            State::RouteDayType => "route_day_type",
            State::RouteCustomTime => "route_custom_time",
            State::ScheduleLine => "schedule_line",
            State::ScheduleStation => "schedule_station",
            State::ScheduleDayType => "schedule_day_type",
            State::StationsLine => "stations_line",
        }
    }

    pub fn from_key(key: &str) -> Option<State> {
        match key {
            "main_menu" => Some(State::MainMenu),
            "route_from_line" => Some(State::RouteFromLine),
            "route_from_station" => Some(State::RouteFromStation),
            "route_to_line" => Some(State::RouteToLine),
            "route_to_station" => Some(State::RouteToStation),
            "route_time_choice" => Some(State::RouteTimeChoice),
            "route_day_type" => Some(State::RouteDayType),
            "route_custom_time" => Some(State::RouteCustomTime),
            "schedule_line" => Some(State::ScheduleLine),
            "schedule_station" => Some(State::ScheduleStation),
            "schedule_day_type" => Some(State::ScheduleDayType),
            "stations_line" => Some(State::StationsLine),
            _ => None,
        }
    }

    /// The state `Back` returns to, per the flow it belongs to. `MainMenu`
    /// has no predecessor; `Back` from it is a no-op.
    pub fn previous(self) -> State {
        match self {
            State::MainMenu => State::MainMenu,
            State::RouteFromLine => State::MainMenu,
            State::RouteFromStation => State::RouteFromLine,
            State::RouteToLine => State::RouteFromStation,
            State::RouteToStation => State::RouteToLine,
            State::RouteTimeChoice => State::RouteToStation,
            State::RouteDayType => State::RouteTimeChoice,
            State::RouteCustomTime => State::RouteDayType,
            State::ScheduleLine => State::MainMenu,
            State::ScheduleStation => State::ScheduleLine,
            State::ScheduleDayType => State::ScheduleStation,
            State::StationsLine => State::MainMenu,
        }
    }
}
