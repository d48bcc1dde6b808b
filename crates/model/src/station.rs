use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::line::{Line, LocalizedText};

/// A metro station, immutable once loaded (spec §3).
///
/// `(line, order)` is unique and dense (1-based) within a line; `transfer_to`,
/// when present, must point at a station on a different line whose own
/// `transfer_to` points back — this is validated at load time by
/// `network::Network::load`, not re-checked here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: LocalizedText,
    pub line: Line,
    pub order: u32,
    pub transfer_to: Option<String>,
}

impl Station {
    /// A terminal is a station whose order is the minimum or maximum on its
    /// line. `min_order`/`max_order` are the bounds of `self.line` within the
    /// whole network, supplied by the caller (usually `network::Network`).
    pub fn is_terminal(&self, min_order: u32, max_order: u32) -> bool {
        self.order == min_order || self.order == max_order
    }
}
