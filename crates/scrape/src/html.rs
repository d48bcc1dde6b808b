use std::sync::Arc;

use futures::future::join_all;
use model::{DayType, Lang, Line, ScheduleEntry, StationSchedule};
use network::Network;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Semaphore;

use crate::error::{Result, ScrapeError};
use crate::source::TimetableSource;

const BASE_URL: &str = "https://www.metro.kharkiv.ua";

/// Relative path of each line's station-listing page, per day type. Mirrors
/// the site's own inconsistent URL scheme (the weekend Saltivska page is a
/// flat `.html` file, the others are directories).
fn line_listing_path(line: Line, day_type: DayType) -> &'static str {
    match (line, day_type) {
        (Line::Red, DayType::Weekday) => "kholodnohikrsko-zavodska-liniia/",
        (Line::Red, DayType::Weekend) => "kholodnohikrsko-zavodska-liniia-vykhidni-dni/",
        (Line::Blue, DayType::Weekday) => "saltivska-liniia/",
        (Line::Blue, DayType::Weekend) => "saltivska-liniia.html",
        (Line::Green, DayType::Weekday) => "oleksiivska-liniia/",
        (Line::Green, DayType::Weekend) => "oleksiivska-liniia-vykhidni-dni/",
    }
}

/// One station discovered on a line-listing page.
struct StationLink {
    station_id: String,
    url: String,
}

/// Fetches and parses the bundled timetable straight from the transit
/// authority's own site. One instance scrapes the whole network: 3 lines by
/// 2 day types for the listing pages, then every discovered station page.
pub struct HtmlTimetableScraper {
    client: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
    network: Arc<Network>,
}

impl HtmlTimetableScraper {
    pub fn new(network: Arc<Network>, max_concurrent: usize) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            network,
        })
    }

    #[cfg(test)]
    fn with_base_url(network: Arc<Network>, base_url: String, max_concurrent: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            network,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let _permit = self.semaphore.acquire().await.expect("semaphore never closed");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Request { url: url.to_string(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::BadStatus { url: url.to_string(), status });
        }
        response
            .text()
            .await
            .map_err(|source| ScrapeError::Request { url: url.to_string(), source })
    }

    /// Fetches one line's listing page and resolves every station link's
    /// visible name to a known station id via the network's own alias-aware
    /// lookup, instead of a separate slug table.
    async fn fetch_line_stations(&self, line: Line, day_type: DayType) -> Result<Vec<StationLink>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), line_listing_path(line, day_type));
        let html = self.fetch(&url).await?;
        let document = Html::parse_document(&html);
        let content_selector = Selector::parse("div.content-text").expect("valid selector");
        let link_selector = Selector::parse("a[href]").expect("valid selector");

        let mut stations = Vec::new();
        let Some(content) = document.select(&content_selector).next() else {
            return Ok(stations);
        };
        for link in content.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.contains("stantsiia-") {
                continue;
            }
            let name = link.text().collect::<String>();
            let name = name.trim().trim_matches(['"', '«', '»']).trim();
            let Some(station) = self.network.find_station(name, Lang::Ua) else {
                tracing::warn!(name, href, "listing link did not resolve to a known station");
                continue;
            };
            stations.push(StationLink {
                station_id: station.id.clone(),
                url: resolve_href(&self.base_url, href),
            });
        }
        Ok(stations)
    }

    /// Fetches one station's page and parses every schedule table on it.
    async fn fetch_station_schedule(&self, station_id: &str, url: &str, day_type: DayType) -> Result<Vec<StationSchedule>> {
        let html = self.fetch(url).await?;
        let document = Html::parse_document(&html);

        let mut schedules = Vec::new();

        for (heading, table) in tables_with_preceding_headings(&document) {
            let Some(heading) = heading else {
                tracing::warn!(url, "schedule table has no preceding direction heading");
                continue;
            };
            let heading_text = heading.text().collect::<String>();
            let Some(direction_name) = extract_quoted(&heading_text) else {
                tracing::warn!(url, heading_text, "direction heading has no quoted station name");
                continue;
            };
            let Some(direction) = self.network.find_station(&direction_name, Lang::Ua) else {
                tracing::warn!(url, direction_name, "direction name did not resolve to a known station");
                continue;
            };

            let entries = parse_schedule_table(table);
            if entries.is_empty() {
                continue;
            }
            let mut schedule = StationSchedule {
                station_id: station_id.to_string(),
                direction_terminal_id: direction.id.clone(),
                day_type,
                entries,
            };
            schedule.normalize();
            schedules.push(schedule);
        }

        Ok(schedules)
    }
}

#[async_trait::async_trait]
impl TimetableSource for HtmlTimetableScraper {
    async fn scrape_all(&self) -> Result<Vec<StationSchedule>> {
        let mut listing_futures = Vec::new();
        for &line in Line::ALL.iter() {
            for day_type in [DayType::Weekday, DayType::Weekend] {
                listing_futures.push(async move {
                    let stations = self.fetch_line_stations(line, day_type).await;
                    (day_type, stations)
                });
            }
        }
        let listings = join_all(listing_futures).await;

        let mut schedule_futures = Vec::new();
        for (day_type, stations) in listings {
            let stations = match stations {
                Ok(stations) => stations,
                Err(err) => {
                    tracing::error!(%err, ?day_type, "failed to fetch a line's station listing");
                    continue;
                }
            };
            for station in stations {
                schedule_futures.push(async move {
                    self.fetch_station_schedule(&station.station_id, &station.url, day_type).await
                });
            }
        }

        let mut all_schedules = Vec::new();
        for result in join_all(schedule_futures).await {
            match result {
                Ok(schedules) => all_schedules.extend(schedules),
                Err(err) => tracing::error!(%err, "failed to fetch a station's schedule page"),
            }
        }
        Ok(all_schedules)
    }
}

fn resolve_href(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// Walks the document in order, pairing every `<table>` with the nearest
/// `h3`/`h4`/`h5`/`strong` heading that precedes it — same rule the site
/// itself uses to label an otherwise headerless timetable table.
fn tables_with_preceding_headings(document: &Html) -> Vec<(Option<ElementRef<'_>>, ElementRef<'_>)> {
    let mut last_heading = None;
    let mut pairs = Vec::new();
    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        match element.value().name() {
            "h3" | "h4" | "h5" | "strong" => last_heading = Some(element),
            "table" => pairs.push((last_heading, element)),
            _ => {}
        }
    }
    pairs
}

/// Pulls the first «quoted» or "quoted" substring out of a heading's text.
fn extract_quoted(text: &str) -> Option<String> {
    let opening = text.find(['«', '"'])?;
    let rest = &text[opening + '«'.len_utf8().max('"'.len_utf8())..];
    let closing = rest.find(['»', '"'])?;
    Some(rest[..closing].trim().to_string())
}

/// First cell is the hour, remaining cells are minutes (asterisks on the
/// last departure of the day are ignored, same as any other non-digit).
fn parse_schedule_table(table: ElementRef) -> Vec<ScheduleEntry> {
    let row_selector = Selector::parse("tr").expect("valid selector");
    let cell_selector = Selector::parse("td, th").expect("valid selector");

    let mut entries = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 2 {
            continue;
        }
        let hour_text = cells[0].text().collect::<String>();
        let Some(hour) = leading_digits(hour_text.trim()) else {
            continue;
        };
        let Ok(hour) = u8::try_from(hour) else {
            continue;
        };

        for cell in &cells[1..] {
            let minute_text = cell.text().collect::<String>();
            let Some(minute) = first_digit_run(minute_text.trim()) else {
                continue;
            };
            if minute < 60 {
                entries.push(ScheduleEntry::new(hour, minute as u8));
            }
        }
    }
    entries
}

/// Parses the run of ASCII digits at the very start of `text` (stops at the
/// first non-digit, e.g. the `:` in `"05:"`).
fn leading_digits(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Parses the first run of ASCII digits found anywhere in `text` (minute
/// cells sometimes carry a trailing `*` marker for the last departure).
fn first_digit_run(text: &str) -> Option<u32> {
    let mut digits = String::new();
    let mut seen = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            seen = true;
        } else if seen {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const SAMPLE_NETWORK: &str = r#"
[lines]
order = ["K", "S"]

[[lines.K.stations]]
id = "kholodna_hora"
name_ua = "Холодна Гора"
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
color = "#c0392b"
emoji = "🔴"
name_ua = "Холодногірсько-Заводська лінія"
name_en = "Kholodnohirsko-Zavodska Line"
display_ua = "Червона лінія"
display_en = "Red Line"

[line_meta.S]
color = "#2980b9"
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

    fn sample_network() -> Arc<Network> {
        Arc::new(Network::load(SAMPLE_NETWORK).unwrap())
    }

    #[test]
    fn extract_quoted_pulls_out_the_guillemet_wrapped_name() {
        let text = "Розклад руху у напрямку станції «Університет»";
        assert_eq!(extract_quoted(text).as_deref(), Some("Університет"));
    }

    #[test]
    fn extract_quoted_also_handles_straight_quotes() {
        assert_eq!(extract_quoted(r#"напрямок "Холодна Гора""#).as_deref(), Some("Холодна Гора"));
    }

    #[test]
    fn leading_digits_stops_at_the_colon() {
        assert_eq!(leading_digits("05:"), Some(5));
        assert_eq!(leading_digits("23"), Some(23));
        assert_eq!(leading_digits("—"), None);
    }

    #[test]
    fn first_digit_run_ignores_the_asterisk_marker() {
        assert_eq!(first_digit_run("47*"), Some(47));
        assert_eq!(first_digit_run("&nbsp;"), None);
    }

    #[test]
    fn parses_a_minimal_schedule_table() {
        let html = Html::parse_document(
            r#"<html><body>
                <h3>Розклад у напрямку станції «Університет»</h3>
                <table>
                    <tr><td>05</td><td>10</td><td>40*</td></tr>
                    <tr><td>06</td><td>00</td><td>20</td></tr>
                </table>
            </body></html>"#,
        );
        let table_selector = Selector::parse("table").unwrap();
        let table = html.select(&table_selector).next().unwrap();
        let entries = parse_schedule_table(table);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], ScheduleEntry::new(5, 10));
        assert_eq!(entries[3], ScheduleEntry::new(6, 20));
    }

    #[test]
    fn tables_pair_with_the_nearest_preceding_heading() {
        let html = r#"<html><body>
            <h4>Розклад у напрямку станції «Університет»</h4>
            <table><tr><td>06</td><td>00</td></tr></table>
            <strong>«Холодна Гора»</strong>
            <table><tr><td>06</td><td>05</td></tr></table>
        </body></html>"#;
        let document = Html::parse_document(html);
        let pairs = tables_with_preceding_headings(&document);
        assert_eq!(pairs.len(), 2);
        let first_name = extract_quoted(&pairs[0].0.unwrap().text().collect::<String>()).unwrap();
        let second_name = extract_quoted(&pairs[1].0.unwrap().text().collect::<String>()).unwrap();
        assert_eq!(first_name, "Університет");
        assert_eq!(second_name, "Холодна Гора");
    }

    #[tokio::test]
    async fn fetch_station_schedule_resolves_direction_by_name() {
        let network = sample_network();
        let scraper = HtmlTimetableScraper::with_base_url(network, "https://example.invalid".to_string(), 4);

        let html = r#"<html><body>
            <h4>Розклад у напрямку станції «Університет»</h4>
            <table><tr><td>06</td><td>00</td></tr></table>
        </body></html>"#;
        let document = Html::parse_document(html);
        let (heading, _table) = tables_with_preceding_headings(&document).into_iter().next().unwrap();
        let name = extract_quoted(&heading.unwrap().text().collect::<String>()).unwrap();
        let direction = scraper.network.find_station(&name, Lang::Ua).unwrap();
        assert_eq!(direction.id, "universytet");
    }
}
