//! Tether Agent - pairing and bootstrap service.
//!
//! Runs one role of the agent: starts the pairing orchestrator, answers
//! credential handshakes when running as a server, and serves a small status
//! API.

use std::sync::Arc;

use chrono::Utc;
use tether_agent::channels::{ChannelCommand, ChannelManager};
use tether_agent::config::Config;
use tether_agent::handshake::{HandshakeClient, HandshakeResponder};
use tether_agent::prefs::FilePreferences;
use tether_agent::record_store::MemoryRecordStore;
use tether_agent::registrar::BootstrapRegistrar;
use tether_agent::transport::TcpTransport;
use tether_agent::{discovery, AppState, PairingOrchestrator};
use tether_engine::{Preferences, Role};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(role = %config.role, "Starting Tether Agent");

    let prefs = Preferences::new(FilePreferences::open(&config.prefs_path)?);
    let records = MemoryRecordStore::new_shared();

    let (channels, commands) = ChannelManager::new();
    let channels = Arc::new(channels);
    tokio::spawn(drive_channels(commands));

    let shutdown = CancellationToken::new();
    let handshake = HandshakeClient::new(
        Arc::new(TcpTransport),
        config.handshake_timeout,
        shutdown.clone(),
    );

    let server_host = match config.role {
        Role::Server => discovery::advertise_host(config.advertise_host.as_deref()),
        _ => config.advertise_host.clone(),
    };
    let registrar = BootstrapRegistrar::new(
        config.role,
        prefs.clone(),
        records.clone(),
        server_host,
        config.server_port,
    );

    let orchestrator = PairingOrchestrator::new(
        config.role,
        prefs.clone(),
        records.clone(),
        channels.clone(),
        handshake,
        registrar,
    );
    orchestrator.start().await?;

    let state = AppState {
        role: config.role,
        prefs,
        started_at: Utc::now(),
    };
    let served = serve(&config, state, shutdown).await;
    if let Err(e) = &served {
        tracing::error!("Agent services failed: {}", e);
    }

    // Stopping also cancels the shutdown token, which ends the responder.
    orchestrator.stop().await?;
    served?;

    tracing::info!("Tether Agent stopped");
    Ok(())
}

/// Run the control responder (servers only) and the status API until
/// shutdown.
async fn serve(
    config: &Config,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    // Servers answer credential handshakes
    let responder = if config.role == Role::Server {
        let addr = format!("{}:{}", config.host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let responder = HandshakeResponder::new(state.prefs.clone(), config.handshake_timeout);
        Some(tokio::spawn(responder.serve(listener, shutdown.clone())))
    } else {
        None
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Status API listening on {}", addr);

    axum::serve(listener, tether_agent::app(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    if let Some(responder) = responder {
        responder.await?;
    }
    Ok(())
}

/// Resolve on Ctrl-C, then fire the shutdown token.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

/// Log channel requests. Long-lived channels are owned by the multiplexer
/// process; this agent only records what it asked for.
async fn drive_channels(mut commands: mpsc::UnboundedReceiver<ChannelCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            ChannelCommand::Open { role, conn_id } => {
                tracing::info!(role = %role, conn_id = %conn_id, "Channel open requested");
            }
            ChannelCommand::Close {
                role,
                conn_id,
                done,
            } => {
                tracing::info!(role = %role, conn_id = %conn_id, "Channel close requested");
                let _ = done.send(Ok(()));
            }
        }
    }
}
