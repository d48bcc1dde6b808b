use std::collections::HashMap;

use serde::Deserialize;

/// Mirrors the bundled data file on disk (spec §6). Deserialized once at
/// load time and immediately consumed into [`crate::Network`]; nothing
/// downstream ever sees this shape again.
#[derive(Debug, Deserialize)]
pub struct RawData {
    pub lines: RawLines,
    #[serde(default)]
    pub transfers: HashMap<String, String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    pub line_meta: HashMap<String, RawLineMeta>,
    pub day_types: HashMap<String, RawDayTypeMeta>,
}

#[derive(Debug, Deserialize)]
pub struct RawLines {
    pub order: Vec<String>,
    #[serde(flatten)]
    pub by_key: HashMap<String, RawLineStations>,
}

#[derive(Debug, Deserialize)]
pub struct RawLineStations {
    pub stations: Vec<RawStation>,
}

#[derive(Debug, Deserialize)]
pub struct RawStation {
    pub id: String,
    pub name_ua: String,
    pub name_en: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLineMeta {
    pub color: String,
    pub emoji: String,
    pub name_ua: String,
    pub name_en: String,
    pub display_ua: String,
    pub display_en: String,
}

#[derive(Debug, Deserialize)]
pub struct RawDayTypeMeta {
    pub emoji: String,
    pub name_ua: String,
    pub name_en: String,
}
