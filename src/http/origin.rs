//! Origin responder.
//!
//! Every response carries a new random token and the current server time,
//! so a leaf can tell a fresh answer from a cached one.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::config::schema::ADVANCED_PROBE_PATH;
use crate::http::server::with_layers;
use crate::http::HEALTH_PATH;
use crate::protocol::OriginResponse;

#[derive(Debug, Clone)]
struct OriginState {
    identifier: Arc<str>,
}

/// Router answering `/probe` and `/healthz` with identical payloads.
pub fn router(identifier: &str) -> Router {
    let state = OriginState {
        identifier: Arc::from(identifier),
    };
    let routes = Router::new()
        .route(ADVANCED_PROBE_PATH, get(respond))
        .route(HEALTH_PATH, get(respond))
        .with_state(state);
    with_layers(routes)
}

async fn respond(State(state): State<OriginState>) -> impl IntoResponse {
    let response = OriginResponse::fresh(&state.identifier);
    tracing::debug!(token = %response.token, "Answering probe");
    ([(header::CACHE_CONTROL, "no-store")], Json(response))
}
