//! Filtering "record appeared" notifications.

use crate::{DeviceRecord, Role};

/// Why a notification is dropped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a self-referential record
    ForeignKind,
    /// Describes the role running locally, already trusted
    LocalRole,
    /// The all-roles placeholder
    Sentinel,
}

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignore(IgnoreReason),
    /// Hand the record to the adopter of this peer role
    Handle(Role),
}

/// Decide what an instance running as `local_role` does with `record`.
pub fn classify(local_role: Role, record: &DeviceRecord) -> Dispatch {
    if !record.is_self_kind() {
        return Dispatch::Ignore(IgnoreReason::ForeignKind);
    }
    if record.role.is_sentinel() {
        return Dispatch::Ignore(IgnoreReason::Sentinel);
    }
    if record.role == local_role {
        return Dispatch::Ignore(IgnoreReason::LocalRole);
    }
    Dispatch::Handle(record.role)
}
