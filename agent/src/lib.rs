//! Tether Agent - pairing and bootstrap for a personal multi-device agent.
//!
//! An agent runs as a client, a server or a cloud instance. When a record of
//! another role appears in the shared record store, the agent adopts what it
//! needs from it: a client pairs with a server by presenting its credential
//! over a short-lived control connection, and any role adopts the cloud id
//! exactly once. Afterwards the agent asks the channel multiplexer to reopen
//! any channel that could not connect before.

pub mod adopt;
pub mod channels;
pub mod config;
pub mod discovery;
pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod prefs;
pub mod record_store;
pub mod registrar;
pub mod routes;
pub mod transport;

pub use crate::error::{AgentError, Result};
pub use crate::orchestrator::{PairingOrchestrator, PipelineReport};

use axum::Router;
use chrono::{DateTime, Utc};
use tether_engine::{Preferences, Role};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub role: Role,
    pub prefs: Preferences,
    pub started_at: DateTime<Utc>,
}

/// Build the status HTTP application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
