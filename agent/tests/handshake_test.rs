//! Credential handshake over real TCP sockets.

use std::sync::Arc;
use std::time::Duration;

use tether_agent::channels::ChannelManager;
use tether_agent::handshake::{HandshakeClient, HandshakeOutcome, HandshakeResponder};
use tether_agent::record_store::MemoryRecordStore;
use tether_agent::registrar::BootstrapRegistrar;
use tether_agent::transport::TcpTransport;
use tether_agent::PairingOrchestrator;
use tether_engine::{
    AdoptionOutcome, Credential, DeviceRecord, MemoryPreferences, Preferences, Role, ServerAddress,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A responder on an ephemeral localhost port.
struct TestServer {
    address: ServerAddress,
    prefs: Preferences,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let prefs = Preferences::new(MemoryPreferences::new());
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(
            HandshakeResponder::new(prefs.clone(), Duration::from_secs(5))
                .serve(listener, shutdown.clone()),
        );

        Self {
            address: ServerAddress::from_host_port("127.0.0.1", port),
            prefs,
            shutdown,
            task,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

fn client(timeout: Duration) -> HandshakeClient {
    HandshakeClient::new(Arc::new(TcpTransport), timeout, CancellationToken::new())
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_credential_is_trusted() {
        let server = TestServer::spawn().await;
        let credential = Credential::generate();

        let outcome = client(Duration::from_secs(5))
            .present_credential(&server.address, &credential)
            .await;

        assert_eq!(outcome, HandshakeOutcome::Accepted);
        assert_eq!(
            server.prefs.authorized_token().unwrap().as_deref(),
            Some(credential.as_hex())
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn test_same_credential_accepted_again() {
        let server = TestServer::spawn().await;
        let credential = Credential::generate();
        let client = client(Duration::from_secs(5));

        for _ in 0..3 {
            let outcome = client
                .present_credential(&server.address, &credential)
                .await;
            assert_eq!(outcome, HandshakeOutcome::Accepted);
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_other_credential_rejected() {
        let server = TestServer::spawn().await;
        let client = client(Duration::from_secs(5));

        let first = client
            .present_credential(&server.address, &Credential::generate())
            .await;
        let second = client
            .present_credential(&server.address, &Credential::generate())
            .await;

        assert_eq!(first, HandshakeOutcome::Accepted);
        assert_eq!(second, HandshakeOutcome::Rejected);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        // Reserve a port, then free it so nothing listens there
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let address = ServerAddress::from_host_port("127.0.0.1", port);

        let outcome = client(Duration::from_secs(5))
            .present_credential(&address, &Credential::generate())
            .await;

        assert!(matches!(outcome, HandshakeOutcome::TransportFailure(_)));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accepts and holds the connection without answering
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let outcome = client(Duration::from_millis(200))
            .present_credential(
                &ServerAddress::from_host_port("127.0.0.1", port),
                &Credential::generate(),
            )
            .await;

        assert!(matches!(outcome, HandshakeOutcome::TransportFailure(_)));
        holder.abort();
    }

    #[tokio::test]
    async fn test_cancelled_client_does_not_connect() {
        let server = TestServer::spawn().await;
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let client = HandshakeClient::new(Arc::new(TcpTransport), Duration::from_secs(5), shutdown);

        let outcome = client
            .present_credential(&server.address, &Credential::generate())
            .await;

        assert!(matches!(outcome, HandshakeOutcome::TransportFailure(_)));
        assert_eq!(server.prefs.authorized_token().unwrap(), None);

        server.stop().await;
    }
}

#[cfg(test)]
mod responder_tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_connection_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Connects and never sends a request
        let idle = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();

        let prefs = Preferences::new(MemoryPreferences::new());
        let responder = HandshakeResponder::new(prefs.clone(), Duration::from_millis(200));

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            responder.handle_connection(accepted),
        )
        .await
        .expect("idle control connection was held open");

        assert!(result.is_err());
        assert_eq!(prefs.authorized_token().unwrap(), None);
        drop(idle);
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;

    #[tokio::test]
    async fn test_client_pairs_with_real_server() {
        let server = TestServer::spawn().await;
        let (host, port) = server.address.host_port().unwrap();

        let prefs = Preferences::new(MemoryPreferences::new());
        let records = MemoryRecordStore::new_shared();
        let (channels, mut commands) = ChannelManager::new();
        let registrar =
            BootstrapRegistrar::new(Role::Client, prefs.clone(), records.clone(), None, port);
        let orchestrator = PairingOrchestrator::new(
            Role::Client,
            prefs.clone(),
            records.clone(),
            Arc::new(channels),
            client(Duration::from_secs(5)),
            registrar,
        );
        orchestrator.start().await.unwrap();

        let report = orchestrator
            .dispatch(DeviceRecord::server(host, port, true))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            report.outcome,
            Ok(AdoptionOutcome::Paired {
                address: server.address.clone()
            })
        );
        assert_eq!(prefs.server_address().unwrap(), Some(server.address.clone()));

        // The server now trusts this client's credential
        let credential = prefs.credential().unwrap().unwrap();
        assert_eq!(
            server.prefs.authorized_token().unwrap().as_deref(),
            Some(credential.as_hex())
        );

        // A reopen was requested for the fresh server channel
        assert!(commands.try_recv().is_ok());

        orchestrator.stop().await.unwrap();
        server.stop().await;
    }
}
