//! Device records surfaced by the synchronization layer.

use crate::{CloudId, Host, Port, Role};
use serde::{Deserialize, Serialize};

/// Kind of the self-referential records that describe an installation's roles.
pub const SELF_KIND: &str = "self";

/// Kind of the companion service records.
pub const COMPANION_KIND: &str = "companion";

/// Label of the companion assistant every cloud instance provisions.
pub const COMPANION_ASSISTANT_LABEL: &str = "assistant";

/// Lookup key of a record in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    /// Record category
    pub kind: String,
    /// Role the record describes
    pub role: Role,
    /// Whether the record belongs to this installation
    pub own: bool,
}

impl RecordKey {
    /// Key of this installation's self-record for `role`.
    pub fn own_self(role: Role) -> Self {
        Self {
            kind: SELF_KIND.to_string(),
            role,
            own: true,
        }
    }
}

/// A record announced by the synchronization layer.
///
/// `host` and `port` are only meaningful for [`Role::Server`], `cloud_id`
/// only for [`Role::Cloud`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Record category
    pub kind: String,
    /// Role the record describes
    pub role: Role,
    /// Whether the record belongs to this installation
    pub own: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Host>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<CloudId>,
    /// Free-form label, used by companion records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DeviceRecord {
    /// Create a bare self-record for `role`.
    pub fn new(role: Role, own: bool) -> Self {
        Self {
            kind: SELF_KIND.to_string(),
            role,
            own,
            host: None,
            port: None,
            cloud_id: None,
            label: None,
        }
    }

    /// Placeholder record for the universal scope.
    pub fn all_roles() -> Self {
        Self::new(Role::All, true)
    }

    /// Self-record of a client.
    pub fn client(own: bool) -> Self {
        Self::new(Role::Client, own)
    }

    /// Self-record of a server reachable at `host:port`.
    pub fn server(host: impl Into<Host>, port: Port, own: bool) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::new(Role::Server, own)
        }
    }

    /// Self-record of a cloud instance.
    pub fn cloud(cloud_id: Option<CloudId>, own: bool) -> Self {
        Self {
            cloud_id,
            ..Self::new(Role::Cloud, own)
        }
    }

    /// The companion assistant record provisioned by cloud instances.
    pub fn companion_assistant() -> Self {
        Self {
            kind: COMPANION_KIND.to_string(),
            label: Some(COMPANION_ASSISTANT_LABEL.to_string()),
            ..Self::new(Role::Cloud, true)
        }
    }

    /// Lookup key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            kind: self.kind.clone(),
            role: self.role,
            own: self.own,
        }
    }

    /// Check if this record is of the self-referential kind.
    pub fn is_self_kind(&self) -> bool {
        self.kind == SELF_KIND
    }
}
