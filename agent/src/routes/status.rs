//! Pairing status endpoint.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_engine::Role;

use crate::error::Result;
use crate::AppState;

/// What this instance currently trusts. Never includes the credential.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub role: Role,
    pub started_at: DateTime<Utc>,
    pub paired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<String>,
    pub credential_present: bool,
}

/// Create status routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let server_address = state.prefs.server_address()?;
    let cloud_id = state.prefs.cloud_id()?;
    let credential_present = state.prefs.credential()?.is_some();

    Ok(Json(StatusResponse {
        role: state.role,
        started_at: state.started_at,
        paired: server_address.is_some(),
        server_address: server_address.map(|a| a.to_string()),
        cloud_id,
        credential_present,
    }))
}
