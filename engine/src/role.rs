//! Device roles.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The personality an agent instance runs as.
///
/// `All` is the sentinel for "every role". It scopes records that apply to
/// the whole installation and is never a real peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Handheld device
    Client,
    /// Local server on the user's network
    Server,
    /// Hosted cloud instance
    Cloud,
    /// Sentinel covering every role
    All,
}

impl Role {
    /// Lowercase name used on the wire and in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
            Role::Cloud => "cloud",
            Role::All => "all",
        }
    }

    /// Whether this is the `All` sentinel.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Role::All)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "server" => Ok(Role::Server),
            "cloud" => Ok(Role::Cloud),
            "all" => Ok(Role::All),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}
