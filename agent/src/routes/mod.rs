//! HTTP route definitions.

mod health;
mod status;

use crate::AppState;
use axum::Router;

pub use health::HealthResponse;
pub use status::StatusResponse;

/// Create all agent routes.
pub fn create_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(status::routes())
}
