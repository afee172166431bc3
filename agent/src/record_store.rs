//! Local view of the device record store.
//!
//! Records are replicated between roles by the synchronization layer, which
//! is not part of this crate. [`RecordStore`] is the slice of it the pairing
//! core consumes, and [`MemoryRecordStore`] is the local replica that layer
//! feeds through [`MemoryRecordStore::announce`].

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tether_engine::{DeviceRecord, RecordKey};
use tokio::sync::broadcast;

use crate::error::Result;

/// Buffered "record appeared" notifications per subscriber.
pub const NOTIFICATION_BUFFER: usize = 256;

/// What the pairing core needs from the synchronization layer.
pub trait RecordStore: Send + Sync {
    /// Stream of "record appeared" notifications.
    fn subscribe(&self) -> broadcast::Receiver<DeviceRecord>;

    fn has_record(&self, key: &RecordKey) -> bool;

    fn get_record(&self, key: &RecordKey) -> Option<DeviceRecord>;

    /// Return the record stored under `record.key()`, creating it from
    /// `record` first if absent. Non-persistent records do not survive a
    /// restart.
    fn load_or_create_record(&self, record: DeviceRecord, persist: bool) -> Result<DeviceRecord>;
}

#[derive(Debug, Clone)]
struct Stored {
    record: DeviceRecord,
    persist: bool,
}

/// In-memory record store with broadcast notifications.
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: DashMap<RecordKey, Stored>,
    appeared: broadcast::Sender<DeviceRecord>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        let (appeared, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            records: DashMap::new(),
            appeared,
        }
    }

    /// Create a new store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert or replace a record received from another role and notify
    /// subscribers.
    ///
    /// Returns the number of subscribers notified.
    pub fn announce(&self, record: DeviceRecord) -> usize {
        self.records.insert(
            record.key(),
            Stored {
                record: record.clone(),
                persist: true,
            },
        );
        self.notify(record)
    }

    /// Insert a record without notifying anyone, as if loaded from disk.
    pub fn preload(&self, record: DeviceRecord) {
        self.records.insert(
            record.key(),
            Stored {
                record,
                persist: true,
            },
        );
    }

    /// Records that outlive the process.
    pub fn persisted(&self) -> Vec<DeviceRecord> {
        self.records
            .iter()
            .filter(|e| e.value().persist)
            .map(|e| e.value().record.clone())
            .collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn notify(&self, record: DeviceRecord) -> usize {
        let kind = record.kind.clone();
        let role = record.role;
        let sent = self.appeared.send(record).unwrap_or(0);
        tracing::debug!(kind = %kind, role = %role, recipients = sent, "Record appeared");
        sent
    }
}

impl RecordStore for MemoryRecordStore {
    fn subscribe(&self) -> broadcast::Receiver<DeviceRecord> {
        self.appeared.subscribe()
    }

    fn has_record(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    fn get_record(&self, key: &RecordKey) -> Option<DeviceRecord> {
        self.records.get(key).map(|e| e.record.clone())
    }

    fn load_or_create_record(&self, record: DeviceRecord, persist: bool) -> Result<DeviceRecord> {
        match self.records.entry(record.key()) {
            Entry::Occupied(existing) => return Ok(existing.get().record.clone()),
            Entry::Vacant(slot) => {
                slot.insert(Stored {
                    record: record.clone(),
                    persist,
                });
            }
        }

        self.notify(record.clone());
        Ok(record)
    }
}
