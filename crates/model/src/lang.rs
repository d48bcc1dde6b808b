use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The two languages the bundled data file and the bot surfaces carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ua,
    En,
}

impl Lang {
    pub fn from_code(code: &str) -> Option<Lang> {
        match code.to_lowercase().as_str() {
            "ua" | "uk" => Some(Lang::Ua),
            "en" => Some(Lang::En),
            _ => None,
        }
    }
}

impl Default for Lang {
    fn default() -> Self {
        Lang::Ua
    }
}
