//! Client side of the credential handshake.

use std::sync::Arc;
use std::time::Duration;

use tether_engine::{Credential, ServerAddress};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ControlMessage;
use crate::transport::{EphemeralConnection, EphemeralTransport};

/// How a credential presentation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The server answered `auth-token-ok`.
    Accepted,
    /// The server answered with anything else.
    Rejected,
    /// No answer: connect failure, early close, bad frame, timeout or shutdown.
    TransportFailure(String),
}

/// Presents the local credential to a candidate server.
///
/// The whole exchange, connect included, is bounded by `timeout` and aborts
/// when the shutdown token fires. An opened connection is always closed
/// before returning.
#[derive(Clone)]
pub struct HandshakeClient {
    transport: Arc<dyn EphemeralTransport>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl HandshakeClient {
    pub fn new(
        transport: Arc<dyn EphemeralTransport>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            timeout,
            shutdown,
        }
    }

    /// Token that cancels in-flight handshakes.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub async fn present_credential(
        &self,
        candidate: &ServerAddress,
        credential: &Credential,
    ) -> HandshakeOutcome {
        let deadline = Instant::now() + self.timeout;

        let opened = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                return HandshakeOutcome::TransportFailure("shutting down".to_string());
            }
            result = tokio::time::timeout_at(deadline, self.transport.open(candidate)) => result,
        };

        let mut conn = match opened {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return HandshakeOutcome::TransportFailure(e.to_string()),
            Err(_) => {
                return HandshakeOutcome::TransportFailure(format!(
                    "connect timed out after {:?}",
                    self.timeout
                ))
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                HandshakeOutcome::TransportFailure("shutting down".to_string())
            }
            result = tokio::time::timeout_at(deadline, exchange(conn.as_mut(), credential)) => {
                result.unwrap_or_else(|_| {
                    HandshakeOutcome::TransportFailure(format!(
                        "no reply within {:?}",
                        self.timeout
                    ))
                })
            }
        };

        match tokio::time::timeout(self.timeout, conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(address = %candidate, "Failed to close control connection: {}", e)
            }
            Err(_) => tracing::warn!(address = %candidate, "Closing control connection timed out"),
        }

        tracing::debug!(address = %candidate, outcome = ?outcome, "Handshake finished");

        outcome
    }
}

/// Send the credential and interpret exactly one reply.
async fn exchange(conn: &mut dyn EphemeralConnection, credential: &Credential) -> HandshakeOutcome {
    let request = ControlMessage::set_auth_token(credential.as_hex());
    if let Err(e) = conn.send(&request).await {
        return HandshakeOutcome::TransportFailure(e.to_string());
    }

    match conn.recv().await {
        Ok(Some(reply)) if reply.is_acceptance() => HandshakeOutcome::Accepted,
        Ok(Some(reply)) => {
            tracing::debug!(reply = ?reply, "Credential not accepted");
            HandshakeOutcome::Rejected
        }
        Ok(None) => HandshakeOutcome::TransportFailure("closed before replying".to_string()),
        Err(e) => HandshakeOutcome::TransportFailure(e.to_string()),
    }
}
