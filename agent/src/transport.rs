//! Ephemeral point-to-point connections for control messages.
//!
//! The handshake only needs "open, send one message, read one message,
//! close". [`TcpTransport`] provides that over plain TCP with one JSON
//! document per line.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tether_engine::ServerAddress;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::error::{AgentError, Result};
use crate::handshake::ControlMessage;

/// Longest accepted control line, in bytes.
pub const MAX_CONTROL_LINE: usize = 64 * 1024;

/// Opens unauthenticated connections to a server's control endpoint.
#[async_trait]
pub trait EphemeralTransport: Send + Sync {
    async fn open(&self, address: &ServerAddress) -> Result<Box<dyn EphemeralConnection>>;
}

/// A single open control connection.
#[async_trait]
pub trait EphemeralConnection: Send {
    async fn send(&mut self, message: &ControlMessage) -> Result<()>;

    /// Next inbound message, or `None` once the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<ControlMessage>>;

    async fn close(&mut self) -> Result<()>;
}

/// TCP transport framing control messages as JSON lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl EphemeralTransport for TcpTransport {
    async fn open(&self, address: &ServerAddress) -> Result<Box<dyn EphemeralConnection>> {
        let target = address.socket_target()?;
        let stream = TcpStream::connect(&target)
            .await
            .map_err(|e| AgentError::Transport(format!("connect to {target}: {e}")))?;

        tracing::debug!(address = %address, "Control connection opened");

        Ok(Box::new(TcpConnection::new(stream)))
    }
}

/// One framed TCP control connection, usable from either side.
pub struct TcpConnection {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_CONTROL_LINE)),
        }
    }
}

#[async_trait]
impl EphemeralConnection for TcpConnection {
    async fn send(&mut self, message: &ControlMessage) -> Result<()> {
        let line = serde_json::to_string(message)?;
        self.framed
            .send(line)
            .await
            .map_err(|e| AgentError::Transport(format!("send failed: {e}")))
    }

    async fn recv(&mut self) -> Result<Option<ControlMessage>> {
        match self.framed.next().await {
            Some(Ok(line)) => serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| AgentError::Transport(format!("malformed control message: {e}"))),
            Some(Err(e)) => Err(AgentError::Transport(format!("read failed: {e}"))),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        SinkExt::<String>::close(&mut self.framed)
            .await
            .map_err(|e| AgentError::Transport(format!("close failed: {e}")))
    }
}
