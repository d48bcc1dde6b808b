use serde::{Deserialize, Serialize};

/// Dual text + structured-JSON envelope every tool-call endpoint returns
/// (spec §6: "dual output (human text + structured JSON)").
#[derive(Debug, Serialize)]
pub struct ToolResponse<T: Serialize> {
    pub status: &'static str,
    pub text: String,
    pub data: T,
}

impl<T: Serialize> ToolResponse<T> {
    pub fn ok(text: impl Into<String>, data: T) -> Self {
        Self { status: "ok", text: text.into(), data }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetRouteParams {
    pub from: String,
    pub to: String,
    pub time: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "day_type")]
    pub day_type: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize)]
pub struct GetScheduleParams {
    pub station: String,
    pub direction: Option<String>,
    #[serde(rename = "day_type")]
    pub day_type: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize)]
pub struct ListStationsParams {
    pub line: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize)]
pub struct FindStationParams {
    pub query: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "ua".to_string()
}
