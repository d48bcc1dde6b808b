pub mod error;
pub mod lookup;
pub mod raw;

use std::collections::HashMap;

use indexmap::IndexMap;
use model::{DayType, DayTypeMeta, Lang, Line, LineMeta, LocalizedText, Station};

pub use error::LoadError;
pub use lookup::NameIndex;

/// The immutable, once-loaded view of the whole network: every station,
/// the line topology, transfer pairs, and display metadata (spec §4.A).
///
/// Constructed once at process init via [`Network::load`] and shared
/// read-only with every consumer; nothing here is ever mutated after load.
#[derive(Debug, Clone)]
pub struct Network {
    stations: IndexMap<String, Station>,
    line_order: Vec<Line>,
    stations_by_line: HashMap<Line, Vec<String>>,
    line_meta: HashMap<Line, LineMeta>,
    day_type_meta: HashMap<DayType, DayTypeMeta>,
    index: NameIndex,
}

impl Network {
    /// Parses the bundled data file and builds the immutable view plus the
    /// name-lookup index. Validates that every transfer pair is symmetric
    /// and that every referenced id resolves to a real station.
    pub fn load(source: &str) -> Result<Self, LoadError> {
        let raw: raw::RawData = toml::from_str(source)?;

        let mut stations = IndexMap::new();
        let mut line_order = Vec::with_capacity(raw.lines.order.len());
        let mut stations_by_line = HashMap::new();

        for key in &raw.lines.order {
            let line = Line::from_key(key)
                .ok_or_else(|| LoadError::MissingLineTable(key.clone()))?;
            let table = raw
                .lines
                .by_key
                .get(key)
                .ok_or_else(|| LoadError::MissingLineTable(key.clone()))?;

            let mut ids = Vec::with_capacity(table.stations.len());
            for (i, raw_station) in table.stations.iter().enumerate() {
                if stations.contains_key(&raw_station.id) {
                    return Err(LoadError::DuplicateStationId(raw_station.id.clone()));
                }
                let station = Station {
                    id: raw_station.id.clone(),
                    name: LocalizedText {
                        ua: raw_station.name_ua.clone(),
                        en: raw_station.name_en.clone(),
                    },
                    line,
                    order: (i + 1) as u32,
                    transfer_to: None,
                };
                ids.push(station.id.clone());
                stations.insert(station.id.clone(), station);
            }
            stations_by_line.insert(line, ids);
            line_order.push(line);
        }

        for (from, to) in &raw.transfers {
            if !stations.contains_key(from) {
                return Err(LoadError::UnknownTransferEndpoint(from.clone()));
            }
            if !stations.contains_key(to) {
                return Err(LoadError::UnknownTransferEndpoint(to.clone()));
            }
            match raw.transfers.get(to) {
                Some(back) if back == from => {}
                _ => {
                    return Err(LoadError::AsymmetricTransfer(from.clone(), to.clone()));
                }
            }
            stations.get_mut(from).unwrap().transfer_to = Some(to.clone());
        }

        let mut line_meta = HashMap::new();
        for line in &line_order {
            let meta = raw
                .line_meta
                .get(line.key())
                .ok_or_else(|| LoadError::MissingLineMeta(line.key().to_string()))?;
            line_meta.insert(
                *line,
                LineMeta {
                    line: *line,
                    color: meta.color.clone(),
                    emoji: meta.emoji.clone(),
                    name: LocalizedText {
                        ua: meta.display_ua.clone(),
                        en: meta.display_en.clone(),
                    },
                },
            );
        }

        let mut day_type_meta = HashMap::new();
        for day_type in [DayType::Weekday, DayType::Weekend] {
            let meta = raw
                .day_types
                .get(day_type.key())
                .ok_or_else(|| LoadError::MissingDayType(day_type.key().to_string()))?;
            day_type_meta.insert(
                day_type,
                DayTypeMeta {
                    day_type,
                    emoji: meta.emoji.clone(),
                    name: LocalizedText {
                        ua: meta.name_ua.clone(),
                        en: meta.name_en.clone(),
                    },
                },
            );
        }

        let mut builder = NameIndex::builder();
        for station in stations.values() {
            builder.add_name(Lang::Ua, &station.name.ua, &station.id);
            builder.add_name(Lang::En, &station.name.en, &station.id);
        }
        for (alias, canonical) in &raw.aliases {
            builder.add_alias(alias, canonical);
        }
        let index = builder.build();

        Ok(Self {
            stations,
            line_order,
            stations_by_line,
            line_meta,
            day_type_meta,
            index,
        })
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn lines(&self) -> &[Line] {
        &self.line_order
    }

    /// Ordered station ids for `line`, ascending by `order`.
    pub fn stations_on_line(&self, line: Line) -> &[String] {
        self.stations_by_line
            .get(&line)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn line_meta(&self, line: Line) -> Option<&LineMeta> {
        self.line_meta.get(&line)
    }

    pub fn day_type_meta(&self, day_type: DayType) -> Option<&DayTypeMeta> {
        self.day_type_meta.get(&day_type)
    }

    /// The `(min, max)` order bounds on `line`, used by `Station::is_terminal`.
    pub fn order_bounds(&self, line: Line) -> Option<(u32, u32)> {
        let ids = self.stations_by_line.get(&line)?;
        let first = self.stations.get(ids.first()?)?.order;
        let last = self.stations.get(ids.last()?)?.order;
        Some((first.min(last), first.max(last)))
    }

    pub fn find_station(&self, query: &str, lang: Lang) -> Option<&Station> {
        let id = self.index.resolve(query, lang)?;
        self.stations.get(id)
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }
}

/// The real Kharkiv metro topology: 3 lines, fixed station order, both
/// transfer pairs, and display metadata in Ukrainian and English.
pub const BUNDLED: &str = include_str!("../data/network.toml");

/// Parses [`BUNDLED`]. This is what every binary in the workspace loads at
/// startup; `Network::load` itself stays generic over the source string so
/// tests can exercise it against small fixtures instead.
pub fn load_bundled() -> Result<Network, LoadError> {
    Network::load(BUNDLED)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[lines]
order = ["K", "S"]

[[lines.K.stations]]
id = "kholodna_hora"
name_ua = "Холодна гора"
name_en = "Kholodna Hora"

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
"хтз" = "Університет"

[line_meta.K]
color = "#E4072F"
emoji = "🔴"
name_ua = "Холодногірсько-Заводська лінія"
name_en = "Kholodnohirsko-Zavodska Line"
display_ua = "Червона лінія"
display_en = "Red Line"

[line_meta.S]
color = "#1C75BC"
emoji = "🔵"
name_ua = "Салтівська лінія"
name_en = "Saltivska Line"
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

    #[test]
    fn loads_and_links_symmetric_transfers() {
        let net = Network::load(SAMPLE).unwrap();
        assert_eq!(
            net.station("maidan_konstytutsii").unwrap().transfer_to.as_deref(),
            Some("istorychnyi_muzei")
        );
        assert_eq!(
            net.station("istorychnyi_muzei").unwrap().transfer_to.as_deref(),
            Some("maidan_konstytutsii")
        );
    }

    #[test]
    fn rejects_asymmetric_transfer() {
        let broken = SAMPLE.replace(
            "istorychnyi_muzei = \"maidan_konstytutsii\"",
            "istorychnyi_muzei = \"universytet\"",
        );
        assert!(matches!(
            Network::load(&broken),
            Err(LoadError::AsymmetricTransfer(_, _))
        ));
    }

    #[test]
    fn alias_resolves_to_same_station_as_canonical() {
        let net = Network::load(SAMPLE).unwrap();
        let via_alias = net.find_station("хтз", Lang::Ua).unwrap();
        let via_canonical = net.find_station("Університет", Lang::Ua).unwrap();
        assert_eq!(via_alias.id, via_canonical.id);
    }

    #[test]
    fn substring_match_falls_back_after_exact_and_alias() {
        let net = Network::load(SAMPLE).unwrap();
        let found = net.find_station("Холодна", Lang::Ua).unwrap();
        assert_eq!(found.id, "kholodna_hora");
    }

    #[test]
    fn order_bounds_cover_whole_line() {
        let net = Network::load(SAMPLE).unwrap();
        let (min, max) = net.order_bounds(Line::Red).unwrap();
        assert_eq!((min, max), (1, 2));
    }

    #[test]
    fn bundled_data_parses_and_has_three_lines() {
        let net = load_bundled().unwrap();
        assert_eq!(net.lines(), &[Line::Red, Line::Blue, Line::Green]);
        assert_eq!(net.stations_on_line(Line::Red).len(), 13);
        assert_eq!(net.stations_on_line(Line::Blue).len(), 8);
        assert_eq!(net.stations_on_line(Line::Green).len(), 9);
    }

    #[test]
    fn bundled_alias_resolves_to_traktornyi_zavod() {
        let net = load_bundled().unwrap();
        let found = net.find_station("хтз", Lang::Ua).unwrap();
        assert_eq!(found.id, "traktornyi_zavod");
    }

    #[test]
    fn bundled_transfer_pairs_are_linked() {
        let net = load_bundled().unwrap();
        assert_eq!(
            net.station("maidan_konstytutsii").unwrap().transfer_to.as_deref(),
            Some("istorychnyi_muzei")
        );
        assert_eq!(
            net.station("palats_sportu").unwrap().transfer_to.as_deref(),
            Some("metrobudivnykiv")
        );
    }
}
