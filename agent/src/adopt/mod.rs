//! Per-role handlers for observed peer records.
//!
//! Each dispatchable role maps to one [`Adopter`]. The orchestrator runs a
//! role's records through its adopter one at a time.

mod cloud;
mod server;

pub use cloud::CloudAdopter;
pub use server::ServerAdoptionController;

use async_trait::async_trait;
use tether_engine::{AdoptionOutcome, DeviceRecord};

use crate::error::Result;

/// Reacts to a peer record of one role.
#[async_trait]
pub trait Adopter: Send + Sync {
    async fn adopt(&self, record: &DeviceRecord) -> Result<AdoptionOutcome>;
}

/// Client records carry nothing other roles need.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientAdopter;

#[async_trait]
impl Adopter for ClientAdopter {
    async fn adopt(&self, _record: &DeviceRecord) -> Result<AdoptionOutcome> {
        Ok(AdoptionOutcome::NoOp)
    }
}
