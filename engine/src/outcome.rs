//! Outcomes of running a record through its adopter.

use crate::{CloudId, ServerAddress};

/// What adopting an observed record did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdoptionOutcome {
    /// Nothing to do: duplicate, inactive role or incomplete record.
    NoOp,
    /// Handshake accepted and the address is now stored.
    Paired { address: ServerAddress },
    /// The server refused our credential. Nothing was stored.
    PairingRejected,
    /// The handshake never produced an answer. Nothing was stored.
    HandshakeFailed { reason: String },
    /// The previous server channel could not be closed, so no handshake ran.
    TeardownFailed { reason: String },
    /// A cloud id was stored for the first time.
    Adopted,
    /// An observed cloud id differs from the stored one.
    IntegrityConflict { stored: CloudId, observed: CloudId },
}

impl AdoptionOutcome {
    /// Short tag for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            AdoptionOutcome::NoOp => "noop",
            AdoptionOutcome::Paired { .. } => "paired",
            AdoptionOutcome::PairingRejected => "pairing_rejected",
            AdoptionOutcome::HandshakeFailed { .. } => "handshake_failed",
            AdoptionOutcome::TeardownFailed { .. } => "teardown_failed",
            AdoptionOutcome::Adopted => "adopted",
            AdoptionOutcome::IntegrityConflict { .. } => "integrity_conflict",
        }
    }
}

impl From<crate::CloudAdoption> for AdoptionOutcome {
    fn from(adoption: crate::CloudAdoption) -> Self {
        match adoption {
            crate::CloudAdoption::Adopted => AdoptionOutcome::Adopted,
            crate::CloudAdoption::NoOp => AdoptionOutcome::NoOp,
            crate::CloudAdoption::IntegrityConflict { stored, observed } => {
                AdoptionOutcome::IntegrityConflict { stored, observed }
            }
        }
    }
}
