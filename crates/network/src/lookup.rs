use std::collections::HashMap;

use model::Lang;
use utility::normalize::normalize_name;

/// Built once from a loaded [`crate::Network`]: maps every name a rider
/// might type to a station id. Lookup order is exact match, then alias,
/// then substring, per spec §4.A.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    /// (language, normalized name) -> station id, for the canonical and
    /// localized names carried by the bundled data.
    exact: HashMap<(Lang, String), String>,
    /// normalized alias -> station id, resolved against the Ukrainian
    /// canonical name before substring fallback is attempted.
    aliases: HashMap<String, String>,
    /// Every (language, normalized name, station id) triple, scanned
    /// linearly for substring matches. Small enough (dozens of stations)
    /// that a linear scan beats a trigram index.
    all_names: Vec<(Lang, String, String)>,
}

impl NameIndex {
    pub fn builder() -> NameIndexBuilder {
        NameIndexBuilder::default()
    }

    /// Resolves a user-typed name to a station id. `query` need not be
    /// normalized already.
    pub fn resolve(&self, query: &str, lang: Lang) -> Option<&str> {
        let normalized = normalize_name(query);
        if normalized.is_empty() {
            return None;
        }

        if let Some(id) = self.exact.get(&(lang, normalized.clone())) {
            return Some(id.as_str());
        }

        if let Some(canonical_id) = self.resolve_alias(&normalized) {
            return Some(canonical_id);
        }

        self.all_names
            .iter()
            .find(|(n_lang, name, _)| *n_lang == lang && name.contains(&normalized))
            .or_else(|| {
                self.all_names
                    .iter()
                    .find(|(n_lang, name, _)| *n_lang == lang && normalized.contains(name.as_str()))
            })
            .map(|(_, _, id)| id.as_str())
    }

    fn resolve_alias(&self, normalized: &str) -> Option<&str> {
        self.aliases.get(normalized).map(|id| id.as_str())
    }
}

#[derive(Default)]
pub struct NameIndexBuilder {
    index: NameIndex,
}

impl NameIndexBuilder {
    pub fn add_name(&mut self, lang: Lang, name: &str, station_id: &str) -> &mut Self {
        let normalized = normalize_name(name);
        self.index
            .exact
            .insert((lang, normalized.clone()), station_id.to_string());
        self.index
            .all_names
            .push((lang, normalized, station_id.to_string()));
        self
    }

    /// `alias` maps to the Ukrainian canonical name; the canonical name is
    /// resolved to a station id through `exact` at build time so later
    /// lookups are O(1).
    pub fn add_alias(&mut self, alias: &str, canonical_ua_name: &str) -> &mut Self {
        let normalized_alias = normalize_name(alias);
        let normalized_canonical = normalize_name(canonical_ua_name);
        if let Some(id) = self
            .index
            .exact
            .get(&(Lang::Ua, normalized_canonical))
            .cloned()
        {
            self.index.aliases.insert(normalized_alias, id);
        }
        self
    }

    pub fn build(self) -> NameIndex {
        self.index
    }
}
