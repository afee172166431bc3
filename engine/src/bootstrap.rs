//! Records every installation must have at startup.

use crate::{CloudId, DeviceRecord, Host, Port, Role};

/// What the local instance knows about itself at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapContext {
    pub role: Role,
    /// Host peers can reach a server on
    pub server_host: Option<Host>,
    /// Port a server listens on for control connections
    pub server_port: Port,
    /// Previously adopted cloud id
    pub cloud_id: Option<CloudId>,
}

/// A record to load or create, and whether it outlives the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEntry {
    pub record: DeviceRecord,
    pub persist: bool,
}

/// The records to ensure at startup, in creation order.
///
/// The all-roles placeholder is never persisted; it is recreated on every
/// start. Cloud instances also provision the companion assistant.
pub fn bootstrap_records(ctx: &BootstrapContext) -> Vec<BootstrapEntry> {
    let mut entries = vec![BootstrapEntry {
        record: DeviceRecord::all_roles(),
        persist: false,
    }];

    let own = match ctx.role {
        Role::Client => DeviceRecord::client(true),
        Role::Server => DeviceRecord {
            host: ctx.server_host.clone(),
            port: Some(ctx.server_port),
            ..DeviceRecord::new(Role::Server, true)
        },
        Role::Cloud => DeviceRecord::cloud(ctx.cloud_id.clone(), true),
        Role::All => return entries,
    };
    entries.push(BootstrapEntry {
        record: own,
        persist: true,
    });

    if ctx.role == Role::Cloud {
        entries.push(BootstrapEntry {
            record: DeviceRecord::companion_assistant(),
            persist: true,
        });
    }

    entries
}
