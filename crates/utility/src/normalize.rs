/// Normalizes a station name for lookup: lower-cases, strips guillemets,
/// curly and straight quotes/apostrophes, and collapses internal whitespace.
pub fn normalize_name(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '«' | '»' | '„' | '“' | '”' | '‘' | '’' | '\'' | '"'))
        .collect();

    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_collapses_whitespace() {
        assert_eq!(
            normalize_name("  «Холодна  гора»  "),
            "холодна гора"
        );
    }

    #[test]
    fn strips_apostrophes() {
        assert_eq!(normalize_name("Дзержинського'"), "дзержинського");
    }
}
