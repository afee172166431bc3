//! Adoption of the cloud identity.

use async_trait::async_trait;
use tether_engine::{AdoptionOutcome, CloudAdoption, CloudIdentityAdopter, DeviceRecord, Preferences};

use super::Adopter;
use crate::error::Result;

/// Stores the cloud id of the first cloud record seen, and never replaces it.
#[derive(Debug, Clone)]
pub struct CloudAdopter {
    prefs: Preferences,
}

impl CloudAdopter {
    pub fn new(prefs: Preferences) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl Adopter for CloudAdopter {
    async fn adopt(&self, record: &DeviceRecord) -> Result<AdoptionOutcome> {
        let Some(observed) = record.cloud_id.as_deref() else {
            tracing::debug!("Cloud record without a cloud id");
            return Ok(AdoptionOutcome::NoOp);
        };

        let adoption = CloudIdentityAdopter::new(&self.prefs).adopt(observed)?;
        match &adoption {
            CloudAdoption::Adopted => {
                tracing::info!(cloud_id = %observed, "Cloud identity adopted");
            }
            CloudAdoption::NoOp => {
                tracing::debug!(cloud_id = %observed, "Cloud identity already known");
            }
            CloudAdoption::IntegrityConflict { stored, observed } => {
                tracing::error!(
                    stored = %stored,
                    observed = %observed,
                    "Cloud identity conflict: stored id kept, observed id ignored"
                );
            }
        }

        Ok(adoption.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_engine::MemoryPreferences;

    #[tokio::test]
    async fn test_adopt_then_conflict() {
        let prefs = Preferences::new(MemoryPreferences::new());
        let adopter = CloudAdopter::new(prefs.clone());

        let outcome = adopter
            .adopt(&DeviceRecord::cloud(Some("abc".into()), true))
            .await
            .unwrap();
        assert_eq!(outcome, AdoptionOutcome::Adopted);

        let outcome = adopter
            .adopt(&DeviceRecord::cloud(Some("xyz".into()), true))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AdoptionOutcome::IntegrityConflict {
                stored: "abc".into(),
                observed: "xyz".into(),
            }
        );
        assert_eq!(prefs.cloud_id().unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_record_without_id() {
        let prefs = Preferences::new(MemoryPreferences::new());
        let outcome = CloudAdopter::new(prefs.clone())
            .adopt(&DeviceRecord::cloud(None, true))
            .await
            .unwrap();

        assert_eq!(outcome, AdoptionOutcome::NoOp);
        assert_eq!(prefs.cloud_id().unwrap(), None);
    }
}
