//! HTTP adapters - Router assembly.
//!
//! Mounts the WebSocket endpoint next to a small health check and applies
//! the shared middleware (request tracing, optional CORS).

use axum::{
    extract::State,
    http::HeaderValue,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::websocket::{websocket_router, WebSocketState};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Sessions with a live connection.
    pub connections: usize,
}

/// Health check handler.
///
/// Route: `GET /health`
pub async fn health_handler(State(state): State<WebSocketState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry().connection_count().await,
    })
}

/// Build the full application router.
///
/// `cors_origins` may be empty, in which case no CORS layer is added.
pub fn app_router(state: WebSocketState, cors_origins: &[String]) -> Router {
    let router = websocket_router()
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors_layer(cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }
    Some(CorsLayer::new().allow_origin(AllowOrigin::list(allowed)))
}
