use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use model::{HOP_MINUTES, TRANSFER_MINUTES};
use network::Network;

/// One edge out of a station: either a same-line hop to the next/previous
/// station in line order, or a transfer walk to a linked station on another
/// line.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub to: usize,
    pub weight_minutes: i64,
    pub is_transfer: bool,
}

/// The routing graph: one node per station, built once from a [`Network`]
/// and never mutated afterward (spec §4.C). Nodes are addressed by a dense
/// index rather than station id so Dijkstra can use plain `Vec` storage.
#[derive(Debug, Clone)]
pub struct Graph {
    station_ids: Vec<String>,
    index_of: HashMap<String, usize>,
    adjacency: Vec<Vec<Edge>>,
}

impl Graph {
    /// Builds adjacency + transfer edges from the network topology:
    /// consecutive same-line stations are linked both ways at
    /// [`HOP_MINUTES`], and every transfer pair is linked both ways at
    /// [`TRANSFER_MINUTES`].
    pub fn build(network: &Network) -> Self {
        let station_ids: Vec<String> = network.stations().map(|s| s.id.clone()).collect();
        let index_of: HashMap<String, usize> = station_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); station_ids.len()];

        for &line in network.lines() {
            let ids = network.stations_on_line(line);
            for pair in ids.windows(2) {
                let a = index_of[&pair[0]];
                let b = index_of[&pair[1]];
                adjacency[a].push(Edge {
                    to: b,
                    weight_minutes: HOP_MINUTES,
                    is_transfer: false,
                });
                adjacency[b].push(Edge {
                    to: a,
                    weight_minutes: HOP_MINUTES,
                    is_transfer: false,
                });
            }
        }

        for station in network.stations() {
            if let Some(other_id) = &station.transfer_to {
                let a = index_of[&station.id];
                let b = index_of[other_id];
                adjacency[a].push(Edge {
                    to: b,
                    weight_minutes: TRANSFER_MINUTES,
                    is_transfer: true,
                });
            }
        }

        Self {
            station_ids,
            index_of,
            adjacency,
        }
    }

    pub fn index_of(&self, station_id: &str) -> Option<usize> {
        self.index_of.get(station_id).copied()
    }

    pub fn station_id(&self, index: usize) -> &str {
        &self.station_ids[index]
    }

    pub fn edges(&self, index: usize) -> &[Edge] {
        &self.adjacency[index]
    }

    pub fn len(&self) -> usize {
        self.station_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.station_ids.is_empty()
    }

    /// Runs Dijkstra from `from` to `to` and returns the shortest path as a
    /// sequence of `(station_id, is_transfer_hop_into_this_station)` pairs
    /// plus the total weight in minutes. The first element's transfer flag
    /// is always `false` (there is no hop into the origin).
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<(Vec<PathStep>, i64)> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;

        if start == goal {
            return Some((
                vec![PathStep {
                    station_id: self.station_id(start).to_string(),
                    is_transfer: false,
                }],
                0,
            ));
        }

        let mut dist = vec![i64::MAX; self.len()];
        let mut prev: Vec<Option<(usize, bool)>> = vec![None; self.len()];
        let mut heap = BinaryHeap::new();

        dist[start] = 0;
        heap.push(HeapEntry {
            cost: 0,
            node: start,
        });

        while let Some(HeapEntry { cost, node }) = heap.pop() {
            if node == goal {
                break;
            }
            if cost > dist[node] {
                continue;
            }
            for edge in self.edges(node) {
                let next_cost = cost + edge.weight_minutes;
                if next_cost < dist[edge.to] {
                    dist[edge.to] = next_cost;
                    prev[edge.to] = Some((node, edge.is_transfer));
                    heap.push(HeapEntry {
                        cost: next_cost,
                        node: edge.to,
                    });
                }
            }
        }

        if dist[goal] == i64::MAX {
            return None;
        }

        let mut steps = Vec::new();
        let mut current = goal;
        let mut incoming_transfer = false;
        loop {
            steps.push(PathStep {
                station_id: self.station_id(current).to_string(),
                is_transfer: incoming_transfer,
            });
            match prev[current] {
                Some((p, was_transfer)) => {
                    incoming_transfer = was_transfer;
                    current = p;
                }
                None => break,
            }
        }
        steps.reverse();

        Some((steps, dist[goal]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub station_id: String,
    pub is_transfer: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct HeapEntry {
    cost: i64,
    node: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost).then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let toml = r#"
[lines]
order = ["K", "S"]

[[lines.K.stations]]
id = "a"
name_ua = "А"
name_en = "A"

[[lines.K.stations]]
id = "b"
name_ua = "Б"
name_en = "B"

[[lines.K.stations]]
id = "c"
name_ua = "В"
name_en = "C"

[[lines.S.stations]]
id = "x"
name_ua = "Х"
name_en = "X"

[[lines.S.stations]]
id = "y"
name_ua = "И"
name_en = "Y"

[transfers]
b = "x"
x = "b"

[line_meta.K]
color = "#fff"
emoji = "k"
name_ua = "К"
name_en = "K"
display_ua = "К"
display_en = "K"

[line_meta.S]
color = "#000"
emoji = "s"
name_ua = "С"
name_en = "S"
display_ua = "С"
display_en = "S"

[day_types.weekday]
emoji = "d"
name_ua = "будній"
name_en = "weekday"

[day_types.weekend]
emoji = "e"
name_ua = "вихідний"
name_en = "weekend"
"#;
        Network::load(toml).unwrap()
    }

    #[test]
    fn same_line_path_has_no_transfers() {
        let net = sample_network();
        let graph = Graph::build(&net);
        let (path, weight) = graph.shortest_path("a", "c").unwrap();
        assert_eq!(weight, HOP_MINUTES * 2);
        assert!(path.iter().all(|s| !s.is_transfer));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn cross_line_path_uses_transfer_edge() {
        let net = sample_network();
        let graph = Graph::build(&net);
        let (path, weight) = graph.shortest_path("a", "y").unwrap();
        assert_eq!(weight, HOP_MINUTES * 2 + TRANSFER_MINUTES);
        let transfer_count = path.iter().filter(|s| s.is_transfer).count();
        assert_eq!(transfer_count, 1);
    }

    #[test]
    fn triangle_closure_holds_for_intermediate_node_on_shortest_path() {
        let net = sample_network();
        let graph = Graph::build(&net);
        let (_, ac) = graph.shortest_path("a", "y").unwrap();
        let (_, ab) = graph.shortest_path("a", "b").unwrap();
        let (_, by) = graph.shortest_path("b", "y").unwrap();
        assert!(ac <= ab + by);
    }
}
