use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset};
use model::{DayType, Lang, Line, MetroError, SessionKey};
use network::Network;
use router::Router;
use scheduler::Scheduler;
use serde_json::Value;
use store::Store;

use crate::fingerprint::{self, RouteCache};
use crate::keyboard::{self, Keyboard};
use crate::prompt::{Outcome, Prompt, ReminderOffer, ReminderOfferButton};
use crate::state::State;
use crate::validation::parse_custom_time;

const KEY_FROM_STATION: &str = "from_station";
const KEY_FROM_LINE: &str = "from_line";
const KEY_TO_STATION: &str = "to_station";
const KEY_DAY_TYPE: &str = "day_type";
const KEY_LINE: &str = "line";
const KEY_STATION: &str = "station";
const KEY_VALID_CHOICES: &str = "valid_choices";

/// How long before a line group's exit time the "prepare to exit" reminder
/// fires.
const EXIT_REMINDER_LEAD_MINUTES: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Metro(#[from] MetroError),
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Scheduler(#[from] scheduler::SchedulerError),
}

/// Opt-in usage counting (spec §1's anonymized-analytics collaborator,
/// spec.md §6's `ENABLE_ANALYTICS`/`ANALYTICS_SALT`). Disabled by default;
/// `metro-bot`/`metro-cli` turn it on via [`Engine::with_analytics`] once
/// `Settings.enable_analytics` is true.
struct AnalyticsConfig {
    salt: String,
}

/// The deterministic per-session FSM (spec §4.G). Owns no transport; it
/// produces [`Prompt`]s for whichever chat transport or CLI is driving it.
pub struct Engine {
    network: Arc<Network>,
    router: Arc<Router>,
    store: Store,
    scheduler: Scheduler,
    route_cache: Mutex<RouteCache>,
    analytics: Option<AnalyticsConfig>,
}

impl Engine {
    pub fn new(network: Arc<Network>, router: Arc<Router>, store: Store, scheduler: Scheduler) -> Self {
        Self {
            network,
            router,
            store,
            scheduler,
            route_cache: Mutex::new(RouteCache::new()),
            analytics: None,
        }
    }

    /// Turns on additive usage counting, salting `user_id` with `salt`
    /// before it ever reaches the store (spec.md §3: `UsageEvent` carries
    /// no raw user id).
    pub fn with_analytics(mut self, enabled: bool, salt: Option<String>) -> Self {
        self.analytics = if enabled { Some(AnalyticsConfig { salt: salt.unwrap_or_default() }) } else { None };
        self
    }

    async fn record_usage(&self, user_id: i64, feature_tag: &str) {
        let Some(analytics) = &self.analytics else { return };
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(analytics.salt.as_bytes());
        hasher.update(user_id.to_string().as_bytes());
        let hashed = format!("{:x}", hasher.finalize());
        let event = model::UsageEvent {
            user_id: hashed,
            feature_tag: feature_tag.to_string(),
            timestamp: chrono::Utc::now(),
        };
        if let Err(err) = store::analytics::record_event(self.store.pool(), &event).await {
            tracing::warn!(%err, "failed to record usage event");
        }
    }

    fn localize_unknown_choice(lang: Lang) -> String {
        match lang {
            Lang::Ua => "Оберіть один із запропонованих варіантів.".to_string(),
            Lang::En => "Please pick one of the options below.".to_string(),
        }
    }

    fn main_menu_outcome(lang: Lang) -> Outcome {
        let text = match lang {
            Lang::Ua => "Що вас цікавить?",
            Lang::En => "What would you like to do?",
        };
        Outcome {
            prompt: Prompt {
                text: text.to_string(),
                keyboard: keyboard::main_menu_keyboard(lang),
            },
            reminder_offer: None,
        }
    }

    async fn set_state(
        &self,
        key: &SessionKey,
        state: State,
        valid_choices: &[String],
    ) -> Result<(), EngineError> {
        store::sessions::set_state(self.store.pool(), key, Some(state.key())).await?;
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(
                KEY_VALID_CHOICES.to_string(),
                Value::Array(valid_choices.iter().cloned().map(Value::String).collect()),
            )]),
        )
        .await?;
        Ok(())
    }

    async fn valid_choices(&self, key: &SessionKey) -> Result<Vec<String>, EngineError> {
        let data = store::sessions::get_data(self.store.pool(), key).await?;
        Ok(match data.get(KEY_VALID_CHOICES) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn current_state(&self, key: &SessionKey) -> Result<State, EngineError> {
        let state_key = store::sessions::get_state(self.store.pool(), key).await?;
        Ok(state_key.and_then(|k| State::from_key(&k)).unwrap_or(State::MainMenu))
    }

    /// Entry point: resets the session to `MainMenu` and returns its
    /// prompt.
    pub async fn start(&self, key: &SessionKey, lang: Lang) -> Result<Outcome, EngineError> {
        store::sessions::clear(self.store.pool(), key).await?;
        self.set_state(key, State::MainMenu, &[]).await?;
        Ok(Self::main_menu_outcome(lang))
    }

    /// Cancel: clear session, return to the main menu (spec §4.G).
    pub async fn cancel(&self, key: &SessionKey, lang: Lang) -> Result<Outcome, EngineError> {
        store::sessions::clear(self.store.pool(), key).await?;
        self.set_state(key, State::MainMenu, &[]).await?;
        Ok(Self::main_menu_outcome(lang))
    }

    fn line_prompt(&self, lang: Lang) -> (String, Keyboard) {
        let text = match lang {
            Lang::Ua => "Оберіть лінію:",
            Lang::En => "Choose a line:",
        };
        (text.to_string(), keyboard::lines_keyboard(&self.network, lang))
    }

    fn station_prompt(&self, line: Line, lang: Lang) -> (String, Keyboard) {
        let text = match lang {
            Lang::Ua => "Оберіть станцію:",
            Lang::En => "Choose a station:",
        };
        (text.to_string(), keyboard::stations_keyboard(&self.network, line, lang))
    }

    fn day_type_prompt(&self, lang: Lang) -> (String, Keyboard) {
        let text = match lang {
            Lang::Ua => "Оберіть тип дня:",
            Lang::En => "Choose a day type:",
        };
        (text.to_string(), keyboard::day_type_keyboard(&self.network, lang))
    }

    /// Universal dispatcher: `Back`/`Cancel` always apply; otherwise the
    /// input is validated against the current state's `valid_choices`
    /// (spec §4.G), except for `RouteCustomTime`, the one free-form state.
    pub async fn handle(
        &self,
        key: &SessionKey,
        lang: Lang,
        now: DateTime<FixedOffset>,
        input: &str,
    ) -> Result<Outcome, EngineError> {
        if input == keyboard::CANCEL {
            return self.cancel(key, lang).await;
        }

        let state = self.current_state(key).await?;

        if input == keyboard::BACK {
            return self.go_back(key, lang, state).await;
        }

        match state {
            State::MainMenu => self.handle_main_menu(key, lang, input).await,
            State::RouteFromLine => self.handle_route_from_line(key, lang, input).await,
            State::RouteFromStation => self.handle_route_from_station(key, lang, input).await,
            State::RouteToLine => self.handle_route_to_line(key, lang, input).await,
            State::RouteToStation => self.handle_route_to_station(key, lang, input).await,
            State::RouteTimeChoice => self.handle_route_time_choice(key, lang, now, input).await,
            State::RouteDayType => self.handle_route_day_type(key, lang, input).await,
            State::RouteCustomTime => self.handle_route_custom_time(key, lang, now, input).await,
            State::ScheduleLine => self.handle_schedule_line(key, lang, input).await,
            State::ScheduleStation => self.handle_schedule_station(key, lang, input).await,
            State::ScheduleDayType => self.handle_schedule_day_type(key, lang, input).await,
            State::StationsLine => self.handle_stations_line(key, lang, input).await,
        }
    }

    /// Back: pop one state, restoring the previous prompt. From
    /// `MainMenu`, it is a no-op (spec §4.G).
    async fn go_back(&self, key: &SessionKey, lang: Lang, state: State) -> Result<Outcome, EngineError> {
        let previous = state.previous();
        match previous {
            State::MainMenu => {
                self.set_state(key, State::MainMenu, &[]).await?;
                Ok(Self::main_menu_outcome(lang))
            }
            State::RouteFromLine | State::ScheduleLine | State::StationsLine => {
                let (text, kb) = self.line_prompt(lang);
                self.set_state(key, previous, &kb.choice_data()).await?;
                Ok(Outcome {
                    prompt: Prompt { text, keyboard: kb },
                    reminder_offer: None,
                })
            }
            State::RouteFromStation | State::RouteToStation | State::ScheduleStation => {
                let data = store::sessions::get_data(self.store.pool(), key).await?;
                let line = data
                    .get(KEY_FROM_LINE)
                    .or_else(|| data.get(KEY_LINE))
                    .and_then(|v| v.as_str())
                    .and_then(Line::from_key)
                    .unwrap_or(Line::Red);
                let (text, kb) = self.station_prompt(line, lang);
                self.set_state(key, previous, &kb.choice_data()).await?;
                Ok(Outcome {
                    prompt: Prompt { text, keyboard: kb },
                    reminder_offer: None,
                })
            }
            State::RouteToLine => {
                let (text, kb) = self.line_prompt(lang);
                self.set_state(key, previous, &kb.choice_data()).await?;
                Ok(Outcome {
                    prompt: Prompt { text, keyboard: kb },
                    reminder_offer: None,
                })
            }
            State::RouteTimeChoice => {
                let kb = keyboard::time_choice_keyboard(lang);
                let text = match lang {
                    Lang::Ua => "Коли вирушаєте?",
                    Lang::En => "When are you leaving?",
                };
                self.set_state(key, previous, &kb.choice_data()).await?;
                Ok(Outcome {
                    prompt: Prompt { text: text.to_string(), keyboard: kb },
                    reminder_offer: None,
                })
            }
            State::RouteDayType | State::ScheduleDayType => {
                let (text, kb) = self.day_type_prompt(lang);
                self.set_state(key, previous, &kb.choice_data()).await?;
                Ok(Outcome {
                    prompt: Prompt { text, keyboard: kb },
                    reminder_offer: None,
                })
            }
            State::RouteCustomTime => unreachable!("RouteCustomTime has no successor state"),
        }
    }

    async fn handle_main_menu(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        match input {
            "menu_route" => {
                let (text, kb) = self.line_prompt(lang);
                self.set_state(key, State::RouteFromLine, &kb.choice_data()).await?;
                Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
            }
            "menu_schedule" => {
                let (text, kb) = self.line_prompt(lang);
                self.set_state(key, State::ScheduleLine, &kb.choice_data()).await?;
                Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
            }
            "menu_stations" => {
                let (text, kb) = self.line_prompt(lang);
                self.set_state(key, State::StationsLine, &kb.choice_data()).await?;
                Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
            }
            _ => Ok(Outcome {
                prompt: Prompt {
                    text: Self::localize_unknown_choice(lang),
                    keyboard: keyboard::main_menu_keyboard(lang),
                },
                reminder_offer: None,
            }),
        }
    }

    async fn reprompt_invalid(
        &self,
        key: &SessionKey,
        lang: Lang,
        state: State,
        text: String,
        keyboard: Keyboard,
    ) -> Result<Outcome, EngineError> {
        let notice = Self::localize_unknown_choice(lang);
        self.set_state(key, state, &keyboard.choice_data()).await?;
        Ok(Outcome {
            prompt: Prompt { text: format!("{notice}\n{text}"), keyboard },
            reminder_offer: None,
        })
    }

    async fn handle_route_from_line(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.line_prompt(lang);
            return self.reprompt_invalid(key, lang, State::RouteFromLine, text, kb).await;
        }
        let line = Line::from_key(input).ok_or_else(|| MetroError::InvalidInput(input.to_string()))?;
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_FROM_LINE.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let (text, kb) = self.station_prompt(line, lang);
        self.set_state(key, State::RouteFromStation, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
    }

    async fn handle_route_from_station(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let data = store::sessions::get_data(self.store.pool(), key).await?;
            let line = data.get(KEY_FROM_LINE).and_then(|v| v.as_str()).and_then(Line::from_key).unwrap_or(Line::Red);
            let (text, kb) = self.station_prompt(line, lang);
            return self.reprompt_invalid(key, lang, State::RouteFromStation, text, kb).await;
        }
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_FROM_STATION.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let (text, kb) = self.line_prompt(lang);
        self.set_state(key, State::RouteToLine, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
    }

    async fn handle_route_to_line(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.line_prompt(lang);
            return self.reprompt_invalid(key, lang, State::RouteToLine, text, kb).await;
        }
        let line = Line::from_key(input).ok_or_else(|| MetroError::InvalidInput(input.to_string()))?;
        let (text, kb) = self.station_prompt(line, lang);
        self.set_state(key, State::RouteToStation, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
    }

    async fn handle_route_to_station(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let data = store::sessions::get_data(self.store.pool(), key).await?;
            // The `to` line was never stored, only used transiently to build
            // this keyboard; re-derive it from the station id's own line.
            let line = data
                .get(KEY_FROM_STATION)
                .and_then(|v| v.as_str())
                .and_then(|id| self.network.station(id))
                .map(|s| s.line)
                .unwrap_or(Line::Red);
            let (text, kb) = self.station_prompt(line, lang);
            return self.reprompt_invalid(key, lang, State::RouteToStation, text, kb).await;
        }
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_TO_STATION.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let kb = keyboard::time_choice_keyboard(lang);
        let text = match lang {
            Lang::Ua => "Коли вирушаєте?",
            Lang::En => "When are you leaving?",
        };
        self.set_state(key, State::RouteTimeChoice, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text: text.to_string(), keyboard: kb }, reminder_offer: None })
    }

    async fn handle_route_time_choice(
        &self,
        key: &SessionKey,
        lang: Lang,
        now: DateTime<FixedOffset>,
        input: &str,
    ) -> Result<Outcome, EngineError> {
        match input {
            "now" => self.build_route(key, lang, now).await,
            "custom" => {
                let (text, kb) = self.day_type_prompt(lang);
                self.set_state(key, State::RouteDayType, &kb.choice_data()).await?;
                Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
            }
            _ => {
                let kb = keyboard::time_choice_keyboard(lang);
                let text = match lang {
                    Lang::Ua => "Коли вирушаєте?",
                    Lang::En => "When are you leaving?",
                };
                self.reprompt_invalid(key, lang, State::RouteTimeChoice, text.to_string(), kb).await
            }
        }
    }

    async fn handle_route_day_type(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.day_type_prompt(lang);
            return self.reprompt_invalid(key, lang, State::RouteDayType, text, kb).await;
        }
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_DAY_TYPE.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let text = match lang {
            Lang::Ua => "Введіть час у форматі ГГ:ХХ (наприклад, 9:15):",
            Lang::En => "Enter a time as HH:MM (e.g. 9:15):",
        };
        self.set_state(key, State::RouteCustomTime, &[]).await?;
        Ok(Outcome {
            prompt: Prompt { text: text.to_string(), keyboard: Keyboard { rows: vec![] } },
            reminder_offer: None,
        })
    }

    async fn handle_route_custom_time(
        &self,
        key: &SessionKey,
        lang: Lang,
        now: DateTime<FixedOffset>,
        input: &str,
    ) -> Result<Outcome, EngineError> {
        match parse_custom_time(input) {
            Ok((hour, minute)) => {
                let desired = utility::time::combine_with_clock(&now, hour as u32, minute as u32);
                let desired = utility::time::roll_forward_if_before(desired, &now);
                self.build_route(key, lang, desired).await
            }
            Err(_) => {
                let text = match lang {
                    Lang::Ua => "Невірний формат часу. Введіть ГГ:ХХ (наприклад, 9:15):",
                    Lang::En => "Invalid time format. Enter HH:MM (e.g. 9:15):",
                };
                Ok(Outcome {
                    prompt: Prompt { text: text.to_string(), keyboard: Keyboard { rows: vec![] } },
                    reminder_offer: None,
                })
            }
        }
    }

    async fn build_route(&self, key: &SessionKey, lang: Lang, desired_departure: DateTime<FixedOffset>) -> Result<Outcome, EngineError> {
        let data = store::sessions::get_data(self.store.pool(), key).await?;
        let from_id = data.get(KEY_FROM_STATION).and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let to_id = data.get(KEY_TO_STATION).and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let day_type = data
            .get(KEY_DAY_TYPE)
            .and_then(|v| v.as_str())
            .and_then(DayType::from_key);

        let result = self.router.route_depart_at(&from_id, &to_id, desired_departure, day_type).await;

        match result {
            Ok(route) => {
                self.record_usage(key.user_id, "route").await;
                let text = render_route(&route, &self.network, lang);
                let mut reminder_offer = None;
                if route.segments.len() > 1 {
                    let groups = fingerprint::line_groups(&route);
                    let offerable: Vec<_> = groups.iter().enumerate().filter(|(_, g)| g.hop_count > 1).collect();
                    if !offerable.is_empty() {
                        let mut cache = self.route_cache.lock().unwrap();
                        if let Some(fp) = cache.insert(&from_id, &to_id, route.clone()) {
                            let buttons = offerable
                                .into_iter()
                                .map(|(index, group)| {
                                    let remind_at = group
                                        .arrival_time
                                        .map(|t| t.timestamp() - EXIT_REMINDER_LEAD_MINUTES * 60)
                                        .unwrap_or(0);
                                    let station_name = self
                                        .network
                                        .station(&group.exit_station_id)
                                        .map(|s| s.name.get(lang).to_string())
                                        .unwrap_or_else(|| group.exit_station_id.clone());
                                    let label = match lang {
                                        Lang::Ua => format!("🔔 Нагадати біля {station_name}"),
                                        Lang::En => format!("🔔 Remind me near {station_name}"),
                                    };
                                    ReminderOfferButton {
                                        group_index: index,
                                        label,
                                        arm_payload: fingerprint::encode_remind_payload(&fp, index, remind_at),
                                    }
                                })
                                .collect();
                            reminder_offer = Some(ReminderOffer { route_fingerprint: fp, buttons });
                        }
                    }
                }
                self.set_state(key, State::MainMenu, &[]).await?;
                Ok(Outcome {
                    prompt: Prompt { text, keyboard: keyboard::main_menu_keyboard(lang) },
                    reminder_offer,
                })
            }
            Err(MetroError::MetroClosed) => {
                self.set_state(key, State::MainMenu, &[]).await?;
                let text = match lang {
                    Lang::Ua => "Метро зараз не працює для цього маршруту.",
                    Lang::En => "The metro isn't running for that trip right now.",
                };
                Ok(Outcome {
                    prompt: Prompt { text: text.to_string(), keyboard: keyboard::main_menu_keyboard(lang) },
                    reminder_offer: None,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Arms a reminder from a `remind|<fp>|<group>|<epoch>` callback
    /// (spec §6). Looks the station up from the cached route so the
    /// callback payload itself only needs to carry the fingerprint.
    pub async fn arm_reminder_from_offer(
        &self,
        user_id: i64,
        lang: Lang,
        fingerprint: &str,
        group_index: usize,
        remind_at_epoch: i64,
    ) -> Result<i64, EngineError> {
        let station_id = {
            let cache = self.route_cache.lock().unwrap();
            let (_, groups) = cache.get(fingerprint).ok_or(MetroError::ExpiredCallback)?;
            groups
                .get(group_index)
                .ok_or(MetroError::ExpiredCallback)?
                .exit_station_id
                .clone()
        };
        let remind_at = chrono::DateTime::<chrono::Utc>::from_timestamp(remind_at_epoch, 0)
            .ok_or_else(|| MetroError::InvalidInput("bad reminder timestamp".to_string()))?;
        Ok(self.scheduler.arm(user_id, fingerprint, station_id, remind_at, lang).await?)
    }

    /// Cancels a previously armed reminder (`remind_cancel|...`).
    pub async fn cancel_reminder(&self, user_id: i64) -> Result<(), EngineError> {
        Ok(self.scheduler.cancel(user_id).await?)
    }

    async fn handle_schedule_line(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.line_prompt(lang);
            return self.reprompt_invalid(key, lang, State::ScheduleLine, text, kb).await;
        }
        let line = Line::from_key(input).ok_or_else(|| MetroError::InvalidInput(input.to_string()))?;
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_LINE.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let (text, kb) = self.station_prompt(line, lang);
        self.set_state(key, State::ScheduleStation, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
    }

    async fn handle_schedule_station(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let data = store::sessions::get_data(self.store.pool(), key).await?;
            let line = data.get(KEY_LINE).and_then(|v| v.as_str()).and_then(Line::from_key).unwrap_or(Line::Red);
            let (text, kb) = self.station_prompt(line, lang);
            return self.reprompt_invalid(key, lang, State::ScheduleStation, text, kb).await;
        }
        store::sessions::update_data(
            self.store.pool(),
            key,
            HashMap::from([(KEY_STATION.to_string(), Value::String(input.to_string()))]),
        )
        .await?;
        let (text, kb) = self.day_type_prompt(lang);
        self.set_state(key, State::ScheduleDayType, &kb.choice_data()).await?;
        Ok(Outcome { prompt: Prompt { text, keyboard: kb }, reminder_offer: None })
    }

    async fn handle_schedule_day_type(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.day_type_prompt(lang);
            return self.reprompt_invalid(key, lang, State::ScheduleDayType, text, kb).await;
        }
        let day_type = DayType::from_key(input).ok_or_else(|| MetroError::InvalidInput(input.to_string()))?;
        let data = store::sessions::get_data(self.store.pool(), key).await?;
        let station_id = data.get(KEY_STATION).and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let schedules = store::schedules::get_all_schedules_for_station(self.store.pool(), &station_id, day_type).await?;
        let text = render_schedule(&station_id, &schedules, &self.network, lang);
        self.record_usage(key.user_id, "schedule").await;
        self.set_state(key, State::MainMenu, &[]).await?;
        Ok(Outcome {
            prompt: Prompt { text, keyboard: keyboard::main_menu_keyboard(lang) },
            reminder_offer: None,
        })
    }

    async fn handle_stations_line(&self, key: &SessionKey, lang: Lang, input: &str) -> Result<Outcome, EngineError> {
        let valid = self.valid_choices(key).await?;
        if !valid.iter().any(|c| c == input) {
            let (text, kb) = self.line_prompt(lang);
            return self.reprompt_invalid(key, lang, State::StationsLine, text, kb).await;
        }
        let line = Line::from_key(input).ok_or_else(|| MetroError::InvalidInput(input.to_string()))?;
        let text = render_stations_list(&self.network, line, lang);
        self.set_state(key, State::MainMenu, &[]).await?;
        Ok(Outcome {
            prompt: Prompt { text, keyboard: keyboard::main_menu_keyboard(lang) },
            reminder_offer: None,
        })
    }
}

fn render_route(route: &model::Route, network: &Network, lang: Lang) -> String {
    let mut lines = Vec::new();
    for segment in &route.segments {
        let from_name = network.station(&segment.from_station).map(|s| s.name.get(lang).to_string()).unwrap_or_else(|| segment.from_station.clone());
        let to_name = network.station(&segment.to_station).map(|s| s.name.get(lang).to_string()).unwrap_or_else(|| segment.to_station.clone());
        let marker = if segment.is_transfer { "🔁" } else { "➡" };
        lines.push(format!("{marker} {from_name} → {to_name} ({} хв)", segment.duration_minutes));
    }
    let total = match lang {
        Lang::Ua => format!("Разом: {} хв, пересадок: {}", route.total_duration_minutes, route.num_transfers),
        Lang::En => format!("Total: {} min, transfers: {}", route.total_duration_minutes, route.num_transfers),
    };
    lines.push(total);
    lines.join("\n")
}

fn render_schedule(station_id: &str, schedules: &[model::StationSchedule], network: &Network, lang: Lang) -> String {
    let station_name = network.station(station_id).map(|s| s.name.get(lang).to_string()).unwrap_or_else(|| station_id.to_string());
    let mut lines = vec![station_name];
    for schedule in schedules {
        let terminal_name = network
            .station(&schedule.direction_terminal_id)
            .map(|s| s.name.get(lang).to_string())
            .unwrap_or_else(|| schedule.direction_terminal_id.clone());
        lines.push(format!("→ {terminal_name}:"));
        let times: Vec<String> = schedule.entries.iter().map(|e| format!("{:02}:{:02}", e.hour, e.minute)).collect();
        lines.push(times.join(", "));
    }
    lines.join("\n")
}

fn render_stations_list(network: &Network, line: Line, lang: Lang) -> String {
    let names: Vec<String> = network
        .stations_on_line(line)
        .iter()
        .filter_map(|id| network.station(id))
        .map(|s| s.name.get(lang).to_string())
        .collect();
    names.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use graph::Graph;
    use scheduler::{LoggingNotifier, Scheduler};
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
id = "maidan_konstytutsii"
name_ua = "Майдан Конституції"
name_en = "Maidan Konstytutsii"

[[lines.S.stations]]
id = "istorychnyi_muzei"
name_ua = "Історичний музей"
name_en = "Istorychnyi Muzei"

[[lines.S.stations]]
id = "universytet"
name_ua = "Університет"
name_en = "Universytet"

[transfers]
maidan_konstytutsii = "istorychnyi_muzei"
istorychnyi_muzei = "maidan_konstytutsii"

[aliases]

[line_meta.K]
color = "#E4072F"
emoji = "🔴"
name_ua = "К"
name_en = "K"
display_ua = "Червона лінія"
display_en = "Red Line"

[line_meta.S]
color = "#1C75BC"
emoji = "🔵"
name_ua = "С"
name_en = "S"
display_ua = "Синя лінія"
display_en = "Blue Line"

[day_types.weekday]
emoji = "📅"
name_ua = "будній день"
name_en = "weekday"

[day_types.weekend]
emoji = "🌴"
name_ua = "вихідний"
name_en = "weekend"
"#;

    async fn sample_engine() -> Engine {
        let network = Arc::new(Network::load(SAMPLE_NETWORK).unwrap());
        let graph = Arc::new(Graph::build(&network));
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();

        let schedules = vec![
            model::StationSchedule {
                station_id: "kholodna_hora".to_string(),
                direction_terminal_id: "maidan_konstytutsii".to_string(),
                day_type: DayType::Weekday,
                entries: vec![model::ScheduleEntry::new(6, 0)],
            },
            model::StationSchedule {
                station_id: "zavod_imeni_malysheva".to_string(),
                direction_terminal_id: "maidan_konstytutsii".to_string(),
                day_type: DayType::Weekday,
                entries: vec![model::ScheduleEntry::new(6, 2)],
            },
            model::StationSchedule {
                station_id: "maidan_konstytutsii".to_string(),
                direction_terminal_id: "maidan_konstytutsii".to_string(),
                day_type: DayType::Weekday,
                entries: vec![model::ScheduleEntry::new(6, 4)],
            },
            model::StationSchedule {
                station_id: "istorychnyi_muzei".to_string(),
                direction_terminal_id: "universytet".to_string(),
                day_type: DayType::Weekday,
                entries: vec![model::ScheduleEntry::new(6, 8)],
            },
            model::StationSchedule {
                station_id: "universytet".to_string(),
                direction_terminal_id: "universytet".to_string(),
                day_type: DayType::Weekday,
                entries: vec![model::ScheduleEntry::new(6, 10)],
            },
        ];
        store::schedules::save_schedules(store.pool(), &schedules).await.unwrap();

        let router = Arc::new(Router::new(network.clone(), graph, store.clone()));
        let scheduler = Scheduler::start(store.clone(), network.clone(), Arc::new(LoggingNotifier));
        Engine::new(network, router, store, scheduler)
    }

    fn noon() -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        tz.with_ymd_and_hms(2026, 7, 27, 5, 55, 0).unwrap()
    }

    fn key() -> SessionKey {
        SessionKey::new(1, 1, "default".to_string())
    }

    #[tokio::test]
    async fn full_route_flow_offers_a_reminder_for_the_multi_hop_leg() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_route").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "K").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "kholodna_hora").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "S").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "universytet").await.unwrap();
        let outcome = engine.handle(&key, Lang::Ua, noon(), "now").await.unwrap();

        assert!(outcome.prompt.text.contains("Разом"));
        let offer = outcome.reminder_offer.expect("multi-hop leg should offer a reminder");
        assert_eq!(offer.buttons.len(), 1);
        assert_eq!(offer.buttons[0].group_index, 0);

        let armed_id = engine
            .arm_reminder_from_offer(42, Lang::Ua, &offer.route_fingerprint, 0, noon().timestamp() + 600)
            .await
            .unwrap();
        assert!(armed_id > 0);
        engine.cancel_reminder(42).await.unwrap();
    }

    #[tokio::test]
    async fn back_returns_to_the_previous_prompts_keyboard() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_route").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "K").await.unwrap();
        let back = engine.handle(&key, Lang::Ua, noon(), "back").await.unwrap();

        assert_eq!(
            engine.current_state(&key).await.unwrap(),
            State::RouteFromLine
        );
        assert!(back.prompt.keyboard.choice_data().contains(&"K".to_string()));
    }

    #[tokio::test]
    async fn cancel_clears_the_session_back_to_the_main_menu() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_route").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "cancel").await.unwrap();

        assert_eq!(engine.current_state(&key).await.unwrap(), State::MainMenu);
    }

    #[tokio::test]
    async fn invalid_choice_reprompts_with_the_same_keyboard() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_route").await.unwrap();
        let outcome = engine.handle(&key, Lang::Ua, noon(), "not_a_line").await.unwrap();

        assert_eq!(engine.current_state(&key).await.unwrap(), State::RouteFromLine);
        assert!(outcome.prompt.keyboard.choice_data().contains(&"K".to_string()));
    }

    #[tokio::test]
    async fn schedule_flow_renders_departures_for_the_chosen_direction() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_schedule").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "K").await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "kholodna_hora").await.unwrap();
        let outcome = engine.handle(&key, Lang::Ua, noon(), "weekday").await.unwrap();

        assert!(outcome.prompt.text.contains("06:00"));
        assert_eq!(engine.current_state(&key).await.unwrap(), State::MainMenu);
    }

    #[tokio::test]
    async fn stations_flow_lists_every_station_on_the_line() {
        let engine = sample_engine().await;
        let key = key();

        engine.start(&key, Lang::Ua).await.unwrap();
        engine.handle(&key, Lang::Ua, noon(), "menu_stations").await.unwrap();
        let outcome = engine.handle(&key, Lang::Ua, noon(), "S").await.unwrap();

        assert!(outcome.prompt.text.contains("Історичний музей"));
        assert!(outcome.prompt.text.contains("Університет"));
    }
}
