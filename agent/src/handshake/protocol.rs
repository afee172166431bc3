//! Control message protocol definitions.
//!
//! Every message is one flat JSON object tagged by its `control` field, using
//! kebab-case tag names.

use serde::{Deserialize, Serialize};

/// Messages exchanged over an ephemeral control connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Client presents its credential.
    SetAuthToken {
        /// Hex-encoded credential
        token: String,
    },

    /// Server accepted the credential.
    AuthTokenOk,

    /// Server holds a different credential.
    AuthTokenRejected,

    /// Server did not understand the request.
    Unsupported,

    /// Any tag this side does not know.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Create a credential presentation.
    pub fn set_auth_token(token: impl Into<String>) -> Self {
        ControlMessage::SetAuthToken {
            token: token.into(),
        }
    }

    /// Whether this reply accepts a presented credential.
    pub fn is_acceptance(&self) -> bool {
        matches!(self, ControlMessage::AuthTokenOk)
    }
}
