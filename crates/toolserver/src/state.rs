use std::sync::Arc;

use network::Network;
use router::Router;

/// Shared handler state (spec §2: Network Model and Router are process-wide
/// singletons). Cheap to clone: everything inside is already an `Arc` or,
/// for `Router`, cloneable behind its own internal `Store` pool.
#[derive(Clone)]
pub struct AppState {
    pub network: Arc<Network>,
    pub router: Arc<Router>,
    pub tz: String,
    pub metro_db_path: String,
}
