//! The aggregation service: receives increments from trackers and serves the aggregates to
//! report views.

pub mod args;
pub mod error;
pub mod handlers;
pub mod store;
pub mod types;

use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::{
    config::Settings,
    daemon::{
        shutdown::detect_shutdown,
        storage::document_store::{DocumentBackend, JsonFileStore, MemoryStore},
    },
    utils::clock::{Clock, DefaultClock},
};

use args::ServeArgs;
use store::RemoteAggregateStore;

/// Directory inside the application directory that holds the server database.
pub const SERVER_STORE_DIR: &str = "server";

pub type SharedStore = Arc<RemoteAggregateStore<DocumentBackend>>;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: SharedStore,
    /// Record every request reads and writes.
    pub user_id: Arc<str>,
    pub clock: Arc<dyn Clock>,
}

impl ApiState {
    pub fn new(store: SharedStore, user_id: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            clock,
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, allowed_origins: &[String]) -> Router {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!("Ignoring CORS origin {origin:?}: {e}"))
                .ok()
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/realtime-update", post(handlers::realtime_update))
        .route("/api/time-data", get(handlers::time_data))
        .route("/api/weekly-report", get(handlers::weekly_report))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `address` until `shutdown` is cancelled.
pub async fn start_server(
    address: SocketAddr,
    state: ApiState,
    allowed_origins: &[String],
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = build_router(state, allowed_origins);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Aggregation service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Aggregation service stopped");
    Ok(())
}

/// Opens the store described by `settings` and serves it until Ctrl-C.
pub async fn run_server(
    app_dir: &Path,
    settings: &Settings,
    args: &ServeArgs,
) -> anyhow::Result<()> {
    let listen = args.listen.unwrap_or(settings.listen);
    let user_id = args.user.as_deref().unwrap_or(&settings.user_id);

    let backend = if args.in_memory {
        info!("Keeping aggregates in memory only");
        DocumentBackend::Memory(MemoryStore::new())
    } else {
        DocumentBackend::File(Arc::new(JsonFileStore::new(app_dir.join(SERVER_STORE_DIR))?))
    };
    let store = RemoteAggregateStore::open(backend, user_id).await?;
    let state = ApiState::new(Arc::new(store), user_id, Arc::new(DefaultClock));

    let shutdown = CancellationToken::new();
    let (_, result) = tokio::join!(
        detect_shutdown(shutdown.clone()),
        async {
            let result =
                start_server(listen, state, &settings.allowed_origins, shutdown.clone()).await;
            shutdown.cancel();
            result
        },
    );
    result
}
