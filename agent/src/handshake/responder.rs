//! Server side of the credential handshake.
//!
//! Answers each control connection with a single message and closes it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether_engine::Preferences;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::ControlMessage;
use crate::error::{AgentError, Result};
use crate::transport::{EphemeralConnection, TcpConnection};

/// Accepts client credentials for a server.
///
/// The first presented token is trusted and persisted; afterwards only that
/// token is accepted. A peer that sends nothing within `read_timeout` is
/// disconnected.
#[derive(Clone)]
pub struct HandshakeResponder {
    prefs: Preferences,
    read_timeout: Duration,
    // serializes the read-then-write of the authorized token
    authorize_lock: Arc<Mutex<()>>,
}

impl HandshakeResponder {
    pub fn new(prefs: Preferences, read_timeout: Duration) -> Self {
        Self {
            prefs,
            read_timeout,
            authorize_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Accept control connections until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, "Control listener ready");
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let responder = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = responder.handle_connection(stream).await {
                                tracing::warn!(peer = %peer, "Control connection failed: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Failed to accept control connection: {}", e);
                    }
                },
            }
        }

        tracing::info!("Control listener stopped");
    }

    /// Read one request, send one reply, close.
    pub async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let mut conn = TcpConnection::new(stream);

        let result = match tokio::time::timeout(self.read_timeout, conn.recv()).await {
            Ok(Ok(Some(request))) => match self.process_message(request) {
                Ok(reply) => conn.send(&reply).await,
                Err(e) => Err(e),
            },
            Ok(Ok(None)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AgentError::Transport(format!(
                "no control request within {:?}",
                self.read_timeout
            ))),
        };

        let closed = conn.close().await;
        result.and(closed)
    }

    /// Answer a single control request.
    pub fn process_message(&self, request: ControlMessage) -> Result<ControlMessage> {
        match request {
            ControlMessage::SetAuthToken { token } => {
                if self.authorize(&token)? {
                    Ok(ControlMessage::AuthTokenOk)
                } else {
                    tracing::warn!("Rejected credential from unpaired client");
                    Ok(ControlMessage::AuthTokenRejected)
                }
            }
            other => {
                tracing::debug!(request = ?other, "Unsupported control request");
                Ok(ControlMessage::Unsupported)
            }
        }
    }

    fn authorize(&self, token: &str) -> Result<bool> {
        if token.is_empty() {
            return Ok(false);
        }

        let _guard = self
            .authorize_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.prefs.authorized_token()? {
            None => {
                self.prefs.set_authorized_token(token)?;
                tracing::info!("Client credential authorized");
                Ok(true)
            }
            Some(authorized) => Ok(authorized == token),
        }
    }
}
