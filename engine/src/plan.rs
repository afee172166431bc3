//! Deciding what an observed server record requires.
//!
//! Planning is pure: it looks at the local role, the stored address and the
//! record, and names the next step. Executing the plan (closing channels,
//! running the handshake, persisting) is the caller's job.

use crate::{DeviceRecord, Role, ServerAddress};

/// The action an observed server record calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPlan {
    /// Only clients pair to a server.
    NotClient,
    /// The record lacks a host or a port.
    MissingEndpoint,
    /// The record points at the address already trusted.
    AlreadyTrusted,
    /// No address is stored yet: run a handshake.
    Pair { candidate: ServerAddress },
    /// The server moved: close the old channel, then run a handshake.
    Repair {
        previous: ServerAddress,
        candidate: ServerAddress,
    },
}

/// Plan the adoption of `record` by an instance running as `local_role`
/// that currently trusts `stored`.
pub fn plan_server_adoption(
    local_role: Role,
    stored: Option<&ServerAddress>,
    record: &DeviceRecord,
) -> ServerPlan {
    if local_role != Role::Client {
        return ServerPlan::NotClient;
    }

    let (Some(host), Some(port)) = (record.host.as_deref(), record.port) else {
        return ServerPlan::MissingEndpoint;
    };
    if host.trim().is_empty() {
        return ServerPlan::MissingEndpoint;
    }

    let candidate = ServerAddress::from_host_port(host, port);

    match stored {
        None => ServerPlan::Pair { candidate },
        Some(previous) if *previous == candidate => ServerPlan::AlreadyTrusted,
        Some(previous) => ServerPlan::Repair {
            previous: previous.clone(),
            candidate,
        },
    }
}
