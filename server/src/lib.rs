//! HTTP backend bridging a torrent search indexer and a Stremio-style
//! transcoding daemon: auth, search passthrough, stream session lifecycle
//! and the playback proxy.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(routes::users::register))
        .route("/api/login", post(routes::users::login))
        .route("/api/search", get(routes::search::search))
        .route("/api/stream", post(routes::stream::create_stream))
        .route(
            "/api/streams/:infoHash/metadata",
            get(routes::stream::stream_metadata),
        )
        .route(
            "/api/streams/:infoHash/activity",
            post(routes::stream::record_activity),
        )
        .route("/api/streams/:infoHash", delete(routes::stream::stop_stream))
        .route("/stream/:infoHash", get(routes::playback::proxy_stream))
        .route("/api/health", get(routes::system::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
