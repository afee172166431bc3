//! Liveness endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tether_engine::Role;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub role: Role,
    pub version: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(|| async { "Tether Agent" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        role: state.role,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
