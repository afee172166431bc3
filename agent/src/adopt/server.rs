//! Pairing a client with an observed server.

use std::sync::Arc;

use async_trait::async_trait;
use tether_engine::{
    plan_server_adoption, AdoptionOutcome, CredentialProvider, DeviceRecord, Preferences, Role,
    ServerAddress, ServerPlan,
};

use super::Adopter;
use crate::channels::ChannelMultiplexer;
use crate::error::Result;
use crate::handshake::{HandshakeClient, HandshakeOutcome};

/// Decides and carries out what an observed server record requires.
///
/// Only a client pairs to a server. On any other role every server record
/// is a no-op.
pub struct ServerAdoptionController {
    local_role: Role,
    prefs: Preferences,
    channels: Arc<dyn ChannelMultiplexer>,
    handshake: HandshakeClient,
}

impl ServerAdoptionController {
    pub fn new(
        local_role: Role,
        prefs: Preferences,
        channels: Arc<dyn ChannelMultiplexer>,
        handshake: HandshakeClient,
    ) -> Self {
        Self {
            local_role,
            prefs,
            channels,
            handshake,
        }
    }

    /// Close the channel to the server we trusted so far and forget its
    /// address. On failure nothing changes.
    async fn tear_down(&self, previous: &ServerAddress) -> Result<Option<AdoptionOutcome>> {
        tracing::info!(previous = %previous, "Server address changed; closing old channel");

        if let Err(e) = self.channels.close(Role::Server).await {
            tracing::warn!(
                previous = %previous,
                "Old server channel did not close; keeping current pairing: {}",
                e
            );
            return Ok(Some(AdoptionOutcome::TeardownFailed {
                reason: e.to_string(),
            }));
        }

        self.prefs.clear_server_address()?;
        Ok(None)
    }

    async fn pair(&self, candidate: ServerAddress) -> Result<AdoptionOutcome> {
        let credential = CredentialProvider::new(&self.prefs).get_or_create()?;

        tracing::info!(candidate = %candidate, "Presenting credential to server");

        match self
            .handshake
            .present_credential(&candidate, &credential)
            .await
        {
            HandshakeOutcome::Accepted => {
                self.prefs.set_server_address(&candidate)?;
                tracing::info!(address = %candidate, "Paired with server");
                Ok(AdoptionOutcome::Paired { address: candidate })
            }
            HandshakeOutcome::Rejected => {
                tracing::warn!(candidate = %candidate, "Server rejected our credential");
                Ok(AdoptionOutcome::PairingRejected)
            }
            HandshakeOutcome::TransportFailure(reason) => {
                tracing::warn!(candidate = %candidate, reason = %reason, "Handshake failed");
                Ok(AdoptionOutcome::HandshakeFailed { reason })
            }
        }
    }
}

#[async_trait]
impl Adopter for ServerAdoptionController {
    async fn adopt(&self, record: &DeviceRecord) -> Result<AdoptionOutcome> {
        let stored = self.prefs.server_address()?;

        match plan_server_adoption(self.local_role, stored.as_ref(), record) {
            ServerPlan::NotClient => Ok(AdoptionOutcome::NoOp),
            ServerPlan::MissingEndpoint => {
                tracing::warn!(record = ?record, "Server record without host or port");
                Ok(AdoptionOutcome::NoOp)
            }
            ServerPlan::AlreadyTrusted => {
                tracing::debug!("Server record matches the trusted address");
                Ok(AdoptionOutcome::NoOp)
            }
            ServerPlan::Pair { candidate } => self.pair(candidate).await,
            ServerPlan::Repair {
                previous,
                candidate,
            } => {
                if let Some(aborted) = self.tear_down(&previous).await? {
                    return Ok(aborted);
                }
                self.pair(candidate).await
            }
        }
    }
}
