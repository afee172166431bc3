//! Long-lived channels to peer roles.
//!
//! The pairing core never frames or keeps channels alive itself. It only asks
//! the multiplexer whether a role is reachable, to reopen one, or to close
//! one. [`ChannelManager`] keeps that bookkeeping and hands the actual work
//! to whoever drains its [`ChannelCommand`] queue.

use async_trait::async_trait;
use dashmap::DashMap;
use tether_engine::Role;
use tokio::sync::{mpsc, oneshot};

use crate::error::{AgentError, Result};

/// What the pairing core needs from the connection multiplexer.
#[async_trait]
pub trait ChannelMultiplexer: Send + Sync {
    /// Whether the channel to `role` is up or being brought up.
    fn is_connectable(&self, role: Role) -> bool;

    /// Ask for the channel to `role` to be (re)opened.
    fn reopen(&self, role: Role);

    /// Close the channel to `role`, completing once it is gone.
    async fn close(&self, role: Role) -> Result<()>;
}

/// Lifecycle of a channel as seen by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Open requested, not confirmed yet
    Connecting,
    /// Channel is up
    Connected,
    /// Last attempt failed; needs a reopen
    Unreachable,
}

/// A single tracked channel.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Identifier of the current connection attempt
    pub id: String,
    /// Peer role at the other end
    pub role: Role,
    pub state: ChannelState,
}

/// Work for the channel driver.
#[derive(Debug)]
pub enum ChannelCommand {
    /// Open a channel to `role`, tagged with the attempt id.
    Open { role: Role, conn_id: String },
    /// Tear down the channel; reply once it is closed.
    Close {
        role: Role,
        conn_id: String,
        done: oneshot::Sender<std::result::Result<(), String>>,
    },
}

/// Sender half of the driver queue.
pub type CommandSender = mpsc::UnboundedSender<ChannelCommand>;

/// Tracks one channel per peer role.
///
/// Thread-safe and can be shared across tasks via `Arc`.
#[derive(Debug)]
pub struct ChannelManager {
    channels: DashMap<Role, Channel>,
    commands: CommandSender,
}

impl ChannelManager {
    /// Create a manager and the queue its driver must drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let manager = Self {
            channels: DashMap::new(),
            commands,
        };
        (manager, rx)
    }

    /// Current state of the channel to `role`.
    pub fn state(&self, role: Role) -> Option<ChannelState> {
        self.channels.get(&role).map(|c| c.state)
    }

    /// Driver callback: the attempt `conn_id` is up.
    pub fn mark_connected(&self, role: Role, conn_id: &str) {
        self.transition(role, conn_id, ChannelState::Connected);
    }

    /// Driver callback: the attempt `conn_id` failed or dropped.
    pub fn mark_unreachable(&self, role: Role, conn_id: &str) {
        self.transition(role, conn_id, ChannelState::Unreachable);
    }

    /// Number of tracked channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn transition(&self, role: Role, conn_id: &str, state: ChannelState) {
        match self.channels.get_mut(&role) {
            Some(mut channel) if channel.id == conn_id => {
                channel.state = state;
                tracing::info!(role = %role, conn_id = %conn_id, state = ?state, "Channel state changed");
            }
            _ => {
                tracing::debug!(role = %role, conn_id = %conn_id, "Ignoring update for stale channel");
            }
        }
    }
}

#[async_trait]
impl ChannelMultiplexer for ChannelManager {
    fn is_connectable(&self, role: Role) -> bool {
        matches!(
            self.state(role),
            Some(ChannelState::Connected | ChannelState::Connecting)
        )
    }

    fn reopen(&self, role: Role) {
        if matches!(self.state(role), Some(ChannelState::Connecting)) {
            return;
        }

        let conn_id = uuid::Uuid::new_v4().to_string();
        self.channels.insert(
            role,
            Channel {
                id: conn_id.clone(),
                role,
                state: ChannelState::Connecting,
            },
        );

        if self
            .commands
            .send(ChannelCommand::Open {
                role,
                conn_id: conn_id.clone(),
            })
            .is_err()
        {
            tracing::warn!(role = %role, "Channel driver is gone; open request dropped");
            self.mark_unreachable(role, &conn_id);
            return;
        }

        tracing::info!(role = %role, conn_id = %conn_id, "Channel reopen requested");
    }

    async fn close(&self, role: Role) -> Result<()> {
        let Some((_, channel)) = self.channels.remove(&role) else {
            return Ok(());
        };

        let (done, ack) = oneshot::channel();
        self.commands
            .send(ChannelCommand::Close {
                role,
                conn_id: channel.id.clone(),
                done,
            })
            .map_err(|_| AgentError::Channel {
                role,
                reason: "channel driver is gone".to_string(),
            })?;

        match ack.await {
            Ok(Ok(())) => {
                tracing::info!(role = %role, conn_id = %channel.id, "Channel closed");
                Ok(())
            }
            Ok(Err(reason)) => Err(AgentError::Channel { role, reason }),
            Err(_) => Err(AgentError::Channel {
                role,
                reason: "channel driver dropped the close request".to_string(),
            }),
        }
    }
}
