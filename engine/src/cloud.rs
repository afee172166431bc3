//! Write-once adoption of the cloud identity.

use crate::{error::Result, CloudId, Preferences};

/// Result of offering a cloud id to the adopter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudAdoption {
    /// No id was stored; the observed id is now stored.
    Adopted,
    /// The observed id is already stored, or carries no identity.
    NoOp,
    /// A different id is already stored. Storage was left untouched.
    IntegrityConflict { stored: CloudId, observed: CloudId },
}

/// Adopts the cloud id observed from a peer record, exactly once.
pub struct CloudIdentityAdopter<'a> {
    prefs: &'a Preferences,
}

impl<'a> CloudIdentityAdopter<'a> {
    pub fn new(prefs: &'a Preferences) -> Self {
        Self { prefs }
    }

    pub fn adopt(&self, observed: &str) -> Result<CloudAdoption> {
        if observed.is_empty() {
            return Ok(CloudAdoption::NoOp);
        }

        match self.prefs.cloud_id()? {
            None => {
                self.prefs.set_cloud_id(observed)?;
                Ok(CloudAdoption::Adopted)
            }
            Some(stored) if stored == observed => Ok(CloudAdoption::NoOp),
            Some(stored) => Ok(CloudAdoption::IntegrityConflict {
                stored,
                observed: observed.to_string(),
            }),
        }
    }
}
