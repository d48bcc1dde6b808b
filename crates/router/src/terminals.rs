use std::collections::HashMap;

use model::Line;
use network::Network;

/// The (first, last) terminal station id of every line, by order. Computed
/// once at router construction and reused for the router's lifetime
/// (spec §4.D step 4).
#[derive(Debug, Clone)]
pub struct LineTerminals {
    by_line: HashMap<Line, (String, String)>,
}

impl LineTerminals {
    pub fn build(network: &Network) -> Self {
        let mut by_line = HashMap::new();
        for &line in network.lines() {
            let ids = network.stations_on_line(line);
            if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
                by_line.insert(line, (first.clone(), last.clone()));
            }
        }
        Self { by_line }
    }

    pub fn first(&self, line: Line) -> Option<&str> {
        self.by_line.get(&line).map(|(f, _)| f.as_str())
    }

    pub fn last(&self, line: Line) -> Option<&str> {
        self.by_line.get(&line).map(|(_, l)| l.as_str())
    }
}
