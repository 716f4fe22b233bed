//! Chathub server - real-time group chat hub.
//!
//! Tracks live WebSocket connections, names them on request, and fans chat
//! and system events out to every connected client.

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod broadcast;
pub mod config;
pub mod handler;
pub mod lifecycle;
pub mod registry;
pub mod state;
mod ws;

pub use broadcast::Broadcaster;
pub use config::ServerConfig;
pub use handler::ChatHub;
pub use lifecycle::{ConnectionPhase, LifecycleManager};
pub use registry::{ConnectionId, ConnectionRegistry, DeliveryError, EventSink};
pub use state::AppState;

/// Build the HTTP router: the hub endpoint plus CORS and request tracing.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.hub_path, get(ws::ws_handler))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value.as_bytes() == b"*" => {
                tracing::warn!("skipping wildcard CORS origin, credentials are allowed");
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("skipping CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers are mirrored.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
