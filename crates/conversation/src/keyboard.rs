use model::{DayType, Lang, Line};
use network::Network;

/// Universal controls accepted at every state (spec §4.G).
pub const BACK: &str = "back";
pub const CANCEL: &str = "cancel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub label: String,
    pub data: String,
}

/// A keyboard laid out as rows of buttons, the way the chat transport
/// expects to render an inline reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    fn new(rows: Vec<Vec<KeyboardButton>>) -> Self {
        Self { rows }
    }

    /// Every generated keyboard appends a trailing Back/Cancel row
    /// (spec §4.G).
    fn with_back_cancel(mut self, lang: Lang) -> Self {
        let back_label = match lang {
            Lang::Ua => "« Назад",
            Lang::En => "« Back",
        };
        let cancel_label = match lang {
            Lang::Ua => "✖ Скасувати",
            Lang::En => "✖ Cancel",
        };
        self.rows.push(vec![
            KeyboardButton {
                label: back_label.to_string(),
                data: BACK.to_string(),
            },
            KeyboardButton {
                label: cancel_label.to_string(),
                data: CANCEL.to_string(),
            },
        ]);
        self
    }

    /// The set of button payloads this keyboard accepts, excluding the
    /// universal Back/Cancel row — stored as a prompt's `valid_choices`
    /// (spec §4.G) so a handler can strictly validate input.
    pub fn choice_data(&self) -> Vec<String> {
        self.rows[..self.rows.len().saturating_sub(1)]
            .iter()
            .flatten()
            .map(|button| button.data.clone())
            .collect()
    }
}

/// One button per configured line, in the network's line order.
pub fn lines_keyboard(network: &Network, lang: Lang) -> Keyboard {
    let rows = network
        .lines()
        .iter()
        .filter_map(|&line| {
            let meta = network.line_meta(line)?;
            Some(vec![KeyboardButton {
                label: format!("{} {}", meta.emoji, meta.name.get(lang)),
                data: line.key().to_string(),
            }])
        })
        .collect();
    Keyboard::new(rows).with_back_cancel(lang)
}

/// Stations on `line`, two per row, in line order (spec §4.G).
pub fn stations_keyboard(network: &Network, line: Line, lang: Lang) -> Keyboard {
    let ids = network.stations_on_line(line);
    let rows = ids
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .filter_map(|id| {
                    let station = network.station(id)?;
                    Some(KeyboardButton {
                        label: station.name.get(lang).to_string(),
                        data: id.clone(),
                    })
                })
                .collect()
        })
        .collect();
    Keyboard::new(rows).with_back_cancel(lang)
}

/// One button per day type (spec §4.G).
pub fn day_type_keyboard(network: &Network, lang: Lang) -> Keyboard {
    let rows = [DayType::Weekday, DayType::Weekend]
        .into_iter()
        .filter_map(|day_type| {
            let meta = network.day_type_meta(day_type)?;
            Some(vec![KeyboardButton {
                label: format!("{} {}", meta.emoji, meta.name.get(lang)),
                data: day_type.key().to_string(),
            }])
        })
        .collect();
    Keyboard::new(rows).with_back_cancel(lang)
}

/// "Leave now" vs "pick a day type and a custom time" (spec §4.G
/// `TimeChoice`).
pub fn time_choice_keyboard(lang: Lang) -> Keyboard {
    let now_label = match lang {
        Lang::Ua => "🕐 Зараз",
        Lang::En => "🕐 Now",
    };
    let custom_label = match lang {
        Lang::Ua => "🕑 Інший час",
        Lang::En => "🕑 Custom time",
    };
    Keyboard::new(vec![
        vec![KeyboardButton {
            label: now_label.to_string(),
            data: "now".to_string(),
        }],
        vec![KeyboardButton {
            label: custom_label.to_string(),
            data: "custom".to_string(),
        }],
    ])
    .with_back_cancel(lang)
}

/// The main menu: plan a route, look up a schedule, or list a line's
/// stations.
pub fn main_menu_keyboard(lang: Lang) -> Keyboard {
    let (route, schedule, stations) = match lang {
        Lang::Ua => ("🚇 Маршрут", "🕐 Розклад", "📍 Станції"),
        Lang::En => ("🚇 Route", "🕐 Schedule", "📍 Stations"),
    };
    Keyboard::new(vec![
        vec![KeyboardButton {
            label: route.to_string(),
            data: "menu_route".to_string(),
        }],
        vec![KeyboardButton {
            label: schedule.to_string(),
            data: "menu_schedule".to_string(),
        }],
        vec![KeyboardButton {
            label: stations.to_string(),
            data: "menu_stations".to_string(),
        }],
    ])
}
