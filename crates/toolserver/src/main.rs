mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use config::Settings;
use graph::Graph;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Default bind address for the tool-call RPC surface (spec §6).
const BIND_ADDR: &str = "0.0.0.0:8090";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let settings = Settings::load()?;
    let network = Arc::new(network::load_bundled()?);
    let graph = Arc::new(Graph::build(&network));

    let path = settings.metro_db_path.to_string_lossy().to_string();
    let store = store::Store::open(&path).await?;
    store::stations::save_stations(store.pool(), &network.stations().cloned().collect::<Vec<_>>()).await?;

    let router = Arc::new(router::Router::new(network.clone(), graph, store));
    let state = AppState { network, router, tz: settings.tz.clone(), metro_db_path: path };

    let app = Router::new()
        .route("/get_route", get(handlers::get_route))
        .route("/get_schedule", get(handlers::get_schedule))
        .route("/list_stations", get(handlers::list_stations))
        .route("/find_station", get(handlers::find_station))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(BIND_ADDR).await?;
    tracing::info!(addr = BIND_ADDR, "tool-call server listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
