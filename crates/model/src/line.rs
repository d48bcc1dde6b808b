use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Lang;

/// One of the three tracks of the network. Each variant carries a stable
/// identifier key used throughout the bundled data file and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    /// "K" — Kholodnohirsko-Zavodska.
    Red,
    /// "S" — Saltivska.
    Blue,
    /// "O" — Oleksiivska.
    Green,
}

impl Line {
    pub const ALL: [Line; 3] = [Line::Red, Line::Blue, Line::Green];

    /// The short key used in the bundled data file and CLI `--line` flag.
    pub fn key(self) -> &'static str {
        match self {
            Line::Red => "K",
            Line::Blue => "S",
            Line::Green => "O",
        }
    }

    pub fn from_key(key: &str) -> Option<Line> {
        match key {
            "K" => Some(Line::Red),
            "S" => Some(Line::Blue),
            "O" => Some(Line::Green),
            _ => None,
        }
    }
}

/// Per-line display metadata loaded from `line_meta.<key>` in the bundled
/// data file: color, emoji and a display name in each supported language.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineMeta {
    pub line: Line,
    pub color: String,
    pub emoji: String,
    pub name: LocalizedText,
}

/// A piece of text available in both supported languages.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocalizedText {
    pub ua: String,
    pub en: String,
}

impl LocalizedText {
    pub fn get(&self, lang: Lang) -> &str {
        match lang {
            Lang::Ua => &self.ua,
            Lang::En => &self.en,
        }
    }
}
