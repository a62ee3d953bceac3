//! Liveness endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Sessions currently held by the registry.
    pub sessions: usize,
    /// Participants with an open socket.
    pub connections: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.registry.session_count(),
        connections: state.hub.connection_count(),
    })
}

/// Routes: `GET /health`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
