//! Unified error handling for the agent.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tether_engine::Role;

/// Agent error type.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Engine error: {0}")]
    Engine(#[from] tether_engine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel to {role} failed: {reason}")]
    Channel { role: Role, reason: String },

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Orchestrator is not running")]
    NotRunning,

    #[error("Orchestrator has been shut down")]
    ShutDown,
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AgentError::Engine(e) => {
                tracing::error!("Engine error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Preference error".to_string(),
                    Some(e.to_string()),
                )
            }
            AgentError::NotRunning | AgentError::ShutDown => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Orchestrator is not running".to_string(),
                None,
            ),
            other => {
                tracing::error!("Internal error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                    Some(other.to_string()),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, AgentError>;
