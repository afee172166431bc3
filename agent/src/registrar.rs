//! Startup registration of the local records.

use std::sync::Arc;

use tether_engine::{bootstrap_records, BootstrapContext, DeviceRecord, Preferences, Role};

use crate::error::Result;
use crate::record_store::RecordStore;

/// Ensures the records every installation needs exist.
///
/// Safe to run on every start: existing records are loaded, not replaced.
pub struct BootstrapRegistrar {
    role: Role,
    prefs: Preferences,
    records: Arc<dyn RecordStore>,
    server_host: Option<String>,
    server_port: u16,
}

impl BootstrapRegistrar {
    pub fn new(
        role: Role,
        prefs: Preferences,
        records: Arc<dyn RecordStore>,
        server_host: Option<String>,
        server_port: u16,
    ) -> Self {
        Self {
            role,
            prefs,
            records,
            server_host,
            server_port,
        }
    }

    /// Load or create each bootstrap record, returning them in order.
    pub fn run(&self) -> Result<Vec<DeviceRecord>> {
        if self.role == Role::Server && self.server_host.is_none() {
            tracing::warn!("No host discovered; server record will not be reachable by clients");
        }

        let ctx = BootstrapContext {
            role: self.role,
            server_host: self.server_host.clone(),
            server_port: self.server_port,
            cloud_id: self.prefs.cloud_id()?,
        };

        let mut ensured = Vec::new();
        for entry in bootstrap_records(&ctx) {
            let record = self
                .records
                .load_or_create_record(entry.record, entry.persist)?;
            tracing::debug!(
                kind = %record.kind,
                role = %record.role,
                persist = entry.persist,
                "Bootstrap record ensured"
            );
            ensured.push(record);
        }

        tracing::info!(role = %self.role, records = ensured.len(), "Bootstrap complete");

        Ok(ensured)
    }
}
