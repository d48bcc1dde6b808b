mod error;
mod render;

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use config::{ConfigFile, Settings};
use error::{CliError, Result};
use graph::Graph;
use model::{DayType, Lang, Line};
use network::Network;
use router::Router;
use scrape::{HtmlTimetableScraper, TimetableSource};
use store::Store;

const MAX_CONCURRENT_SCRAPES: usize = 10;

#[derive(Parser)]
#[command(name = "kharkiv-metro", about = "Kharkiv metro routing, schedules and station lookup")]
struct Cli {
    /// Disable ANSI colors in error output.
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

/// Wraps `text` in red ANSI escapes unless `--no-color` was passed.
fn red(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[31m{text}\x1b[0m")
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create the timetable store and seed it with the bundled station list.
    Init,
    /// Fetch live timetables from the transit authority's site and upsert them.
    Scrape {
        /// Also seed the station list first, as `init` would.
        #[arg(long)]
        init_db: bool,
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        output: TableFormat,
    },
    /// List stations, optionally filtered to one line.
    Stations {
        #[arg(long)]
        line: Option<String>,
        #[arg(long, default_value = "ua")]
        lang: String,
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        output: TableFormat,
    },
    /// Print a station's departure timetable.
    Schedule {
        station: String,
        #[arg(long)]
        direction: Option<String>,
        #[arg(long = "day-type")]
        day_type: Option<String>,
        #[arg(long, default_value = "ua")]
        lang: String,
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        output: TableFormat,
    },
    /// Plan a route between two stations.
    Route {
        from: String,
        to: String,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "day-type")]
        day_type: Option<String>,
        #[arg(long, default_value = "ua")]
        lang: String,
        #[arg(long, value_enum, default_value = "full")]
        format: RouteFormat,
        #[arg(long)]
        compact: bool,
    },
    /// Manage the on-disk configuration overlay.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Reset,
    Open,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableFormat {
    Json,
    Table,
}

#[derive(Clone, Copy, ValueEnum)]
enum RouteFormat {
    Full,
    Simple,
    Json,
}

fn parse_lang(code: &str) -> Result<Lang> {
    Lang::from_code(code).ok_or_else(|| CliError::InvalidArgument(format!("unknown language: {code}")))
}

fn parse_line(key: &str) -> Result<Line> {
    Line::from_key(&key.to_uppercase()).ok_or_else(|| CliError::InvalidArgument(format!("unknown line: {key}")))
}

fn parse_day_type(key: &str) -> Result<DayType> {
    DayType::from_key(key).ok_or_else(|| CliError::InvalidArgument(format!("unknown day type: {key}")))
}

fn load_network() -> Result<Arc<Network>> {
    Ok(Arc::new(network::load_bundled()?))
}

fn bundled_stations(network: &Network) -> Vec<model::Station> {
    network.stations().cloned().collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let wants_json = matches!(
        &cli.command,
        Command::Scrape { output: TableFormat::Json, .. }
            | Command::Stations { output: TableFormat::Json, .. }
            | Command::Schedule { output: TableFormat::Json, .. }
            | Command::Route { format: RouteFormat::Json, .. }
    );

    let no_color = cli.no_color;
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if wants_json {
                println!("{}", render::error_json(&err.to_string()));
            } else {
                eprintln!("{}", red(&err.to_string(), no_color));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Init => run_init().await,
        Command::Scrape { init_db, output } => run_scrape(init_db, output).await,
        Command::Stations { line, lang, output } => run_stations(line, lang, output).await,
        Command::Schedule { station, direction, day_type, lang, output } => {
            run_schedule(station, direction, day_type, lang, output).await
        }
        Command::Route { from, to, time, date, day_type, lang, format, compact } => {
            run_route(from, to, time, date, day_type, lang, format, compact).await
        }
        Command::Config { action } => run_config(action).await,
    }
}

async fn run_init() -> Result<()> {
    let settings = Settings::load()?;
    let network = load_network()?;
    let path = settings.metro_db_path.to_string_lossy().to_string();
    let store = Store::open(&path).await?;
    store::stations::save_stations(store.pool(), &bundled_stations(&network)).await?;
    println!("Initialized {path} with {} stations.", network.stations().count());
    Ok(())
}

async fn run_scrape(init_db: bool, output: TableFormat) -> Result<()> {
    let settings = Settings::load()?;
    let network = load_network()?;
    let path = settings.metro_db_path.to_string_lossy().to_string();
    let store = Store::open(&path).await?;

    if init_db {
        store::stations::save_stations(store.pool(), &bundled_stations(&network)).await?;
    }

    let scraper = HtmlTimetableScraper::new(network.clone(), MAX_CONCURRENT_SCRAPES)?;
    let schedules = scraper.scrape_all().await?;
    store::schedules::save_schedules(store.pool(), &schedules).await?;

    match output {
        TableFormat::Json => {
            println!("{}", serde_json::json!({ "status": "ok", "schedules_scraped": schedules.len() }));
        }
        TableFormat::Table => {
            println!("Scraped {} station schedules.", schedules.len());
        }
    }
    Ok(())
}

async fn run_stations(line: Option<String>, lang: String, output: TableFormat) -> Result<()> {
    let lang = parse_lang(&lang)?;
    let network = load_network()?;
    let line = line.map(|l| parse_line(&l)).transpose()?;

    let mut stations: Vec<model::Station> = match line {
        Some(line) => network.stations_on_line(line).iter().filter_map(|id| network.station(id).cloned()).collect(),
        None => network.stations().cloned().collect(),
    };
    stations.sort_by_key(|s| (s.line.key().to_string(), s.order));

    match output {
        TableFormat::Json => println!("{}", render::format_stations_json(&stations)),
        TableFormat::Table => println!("{}", render::format_stations_table(&stations, lang)),
    }
    Ok(())
}

async fn run_schedule(
    station: String,
    direction: Option<String>,
    day_type: Option<String>,
    lang: String,
    output: TableFormat,
) -> Result<()> {
    let lang = parse_lang(&lang)?;
    let settings = Settings::load()?;
    let network = load_network()?;
    let day_type = day_type.map(|d| parse_day_type(&d)).transpose()?.unwrap_or_else(|| DayType::for_date(Utc::now()));

    let station = network
        .find_station(&station, lang)
        .ok_or_else(|| model::MetroError::UnknownStation(station.clone()))?;

    let path = settings.metro_db_path.to_string_lossy().to_string();
    let store = Store::open(&path).await?;

    let schedules = match direction {
        Some(direction) => {
            let terminal = network
                .find_station(&direction, lang)
                .ok_or_else(|| model::MetroError::UnknownStation(direction.clone()))?;
            let entries = store::schedules::get_schedule(store.pool(), &station.id, &terminal.id, day_type).await?;
            vec![model::StationSchedule {
                station_id: station.id.clone(),
                direction_terminal_id: terminal.id.clone(),
                day_type,
                entries,
            }]
        }
        None => store::schedules::get_all_schedules_for_station(store.pool(), &station.id, day_type).await?,
    };

    match output {
        TableFormat::Json => println!("{}", render::format_schedule_json(&schedules)),
        TableFormat::Table => println!("{}", render::format_schedule_table(&station.id, &schedules, &network, lang)),
    }
    Ok(())
}

fn resolve_departure(
    time: Option<String>,
    date: Option<String>,
    tz_name: &str,
) -> Result<chrono::DateTime<chrono::FixedOffset>> {
    let tz: chrono_tz::Tz = tz_name
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("unknown timezone: {tz_name}")))?;

    if time.is_none() && date.is_none() {
        return Ok(Utc::now().with_timezone(&tz).fixed_offset());
    }

    let now_in_tz = Utc::now().with_timezone(&tz);
    let date = match date {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|_| CliError::InvalidArgument(format!("invalid date (expected YYYY-MM-DD): {d}")))?,
        None => now_in_tz.date_naive(),
    };
    let (hour, minute) = match time {
        Some(t) => conversation::validation::parse_custom_time(&t)?,
        None => (now_in_tz.time().hour() as u8, now_in_tz.time().minute() as u8),
    };
    let naive_time = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)
        .ok_or_else(|| CliError::InvalidArgument(format!("invalid time: {hour}:{minute}")))?;
    let naive = date.and_time(naive_time);
    let local = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| CliError::InvalidArgument("ambiguous or invalid local time".to_string()))?;
    Ok(local.fixed_offset())
}

async fn run_route(
    from: String,
    to: String,
    time: Option<String>,
    date: Option<String>,
    day_type: Option<String>,
    lang: String,
    format: RouteFormat,
    compact: bool,
) -> Result<()> {
    let lang = parse_lang(&lang)?;
    let settings = Settings::load()?;
    let network = load_network()?;
    let graph = Arc::new(Graph::build(&network));
    let day_type = day_type.map(|d| parse_day_type(&d)).transpose()?;

    let from_station = network.find_station(&from, lang).ok_or_else(|| model::MetroError::UnknownStation(from.clone()))?;
    let to_station = network.find_station(&to, lang).ok_or_else(|| model::MetroError::UnknownStation(to.clone()))?;

    let departure = resolve_departure(time, date, &settings.tz)?;

    let path = settings.metro_db_path.to_string_lossy().to_string();
    let store = Store::open(&path).await?;
    let router = Router::new(network.clone(), graph, store);

    let route = router.route_depart_at(&from_station.id, &to_station.id, departure, day_type).await?;

    match format {
        RouteFormat::Full => println!("{}", render::format_route_full(&route, &network, lang, compact)),
        RouteFormat::Simple => println!("{}", render::format_route_simple(&route, &network, lang, compact)),
        RouteFormat::Json => println!("{}", render::format_route_json(&route)),
    }
    Ok(())
}

async fn run_config(action: ConfigAction) -> Result<()> {
    let path = config::default_config_path()?;
    match action {
        ConfigAction::Show => {
            let file = ConfigFile::load(&path)?;
            let settings = Settings::resolve(&file);
            println!("Config file: {}", path.display());
            println!("Database: {}", settings.metro_db_path.display());
            println!();
            for key in config::KEYS {
                let value = file.get(key)?.unwrap_or_else(|| "(unset)".to_string());
                println!("  {key} = {value}");
            }
        }
        ConfigAction::Set { key, value } => {
            let mut file = ConfigFile::load(&path)?;
            file.set(&key, &value)?;
            file.save(&path)?;
            println!("Set {key} = {value}");
        }
        ConfigAction::Reset => {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|source| config::ConfigError::Write { path: path.clone(), source })?;
            }
            println!("Configuration reset to defaults.");
        }
        ConfigAction::Open => {
            ConfigFile::load(&path)?.save(&path)?;
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());
            let status = std::process::Command::new(&editor).arg(&path).status();
            match status {
                Ok(status) if status.success() => println!("Opened {}", path.display()),
                _ => {
                    println!("Config path: {}", path.display());
                    return Err(CliError::InvalidArgument(format!("failed to launch editor '{editor}'")));
                }
            }
        }
    }
    Ok(())
}
