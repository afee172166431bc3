//! Configuration management for the agent.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tether_engine::Role;

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Role this instance runs as
    pub role: Role,
    /// Status HTTP bind host
    pub host: String,
    /// Status HTTP bind port
    pub port: u16,
    /// Control port a server listens on and advertises
    pub server_port: u16,
    /// Host advertised in the server record, overriding discovery
    pub advertise_host: Option<String>,
    /// JSON file backing the preference store
    pub prefs_path: PathBuf,
    /// Upper bound on waiting for a handshake reply
    pub handshake_timeout: Duration,
}

impl Config {
    /// Default wait for a handshake reply.
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let role = env::var("TETHER_ROLE").map_err(|_| ConfigError::MissingRole)?;
        let role: Role = role
            .parse()
            .map_err(|_| ConfigError::InvalidRole(role.clone()))?;
        if role.is_sentinel() {
            return Err(ConfigError::InvalidRole(role.to_string()));
        }

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "7400".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidServerPort)?;

        let advertise_host = env::var("ADVERTISE_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty());

        let prefs_path = env::var("PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tether-prefs.json"));

        let handshake_timeout = match env::var("HANDSHAKE_TIMEOUT_MS") {
            Ok(raw) => {
                let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidTimeout)?;
                if millis == 0 {
                    return Err(ConfigError::InvalidTimeout);
                }
                Duration::from_millis(millis)
            }
            Err(_) => Self::DEFAULT_HANDSHAKE_TIMEOUT,
        };

        Ok(Self {
            role,
            host,
            port,
            server_port,
            advertise_host,
            prefs_path,
            handshake_timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TETHER_ROLE environment variable is required")]
    MissingRole,

    #[error("Invalid TETHER_ROLE value: {0} (expected client, server or cloud)")]
    InvalidRole(String),

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid SERVER_PORT value")]
    InvalidServerPort,

    #[error("Invalid HANDSHAKE_TIMEOUT_MS value")]
    InvalidTimeout,
}
