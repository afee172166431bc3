//! Fakes and harness shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tether_agent::channels::ChannelMultiplexer;
use tether_agent::handshake::{ControlMessage, HandshakeClient};
use tether_agent::record_store::MemoryRecordStore;
use tether_agent::registrar::BootstrapRegistrar;
use tether_agent::transport::{EphemeralConnection, EphemeralTransport};
use tether_agent::{AgentError, PairingOrchestrator, PipelineReport, Result};
use tether_engine::{MemoryPreferences, Preferences, Role, ServerAddress};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Ordered log of collaborator calls.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// How the fake server behaves once a connection is open.
#[derive(Clone, Debug)]
pub enum Behavior {
    Reply(ControlMessage),
    /// Never answers
    Silent,
    /// Closes without answering
    CloseWithoutReply,
    /// Connection cannot be opened
    Refuse,
}

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: Mutex<Vec<ControlMessage>>,
}

pub struct FakeTransport {
    behavior: Behavior,
    delay: Duration,
    log: EventLog,
    counters: Arc<Counters>,
}

impl FakeTransport {
    pub fn new(behavior: Behavior, log: EventLog) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            log,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Delay every reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ControlMessage> {
        self.counters.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EphemeralTransport for FakeTransport {
    async fn open(&self, address: &ServerAddress) -> Result<Box<dyn EphemeralConnection>> {
        self.log.push(format!("open {address}"));
        self.counters.opens.fetch_add(1, Ordering::SeqCst);

        if matches!(self.behavior, Behavior::Refuse) {
            return Err(AgentError::Transport("connection refused".to_string()));
        }

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(FakeConnection {
            behavior: self.behavior.clone(),
            delay: self.delay,
            log: self.log.clone(),
            counters: self.counters.clone(),
            closed: false,
        }))
    }
}

struct FakeConnection {
    behavior: Behavior,
    delay: Duration,
    log: EventLog,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl EphemeralConnection for FakeConnection {
    async fn send(&mut self, message: &ControlMessage) -> Result<()> {
        self.counters.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ControlMessage>> {
        tokio::time::sleep(self.delay).await;
        match &self.behavior {
            Behavior::Reply(reply) => Ok(Some(reply.clone())),
            Behavior::Silent => std::future::pending().await,
            Behavior::CloseWithoutReply | Behavior::Refuse => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            self.log.push("close connection");
        }
        Ok(())
    }
}

// ============================================================================
// Channels
// ============================================================================

pub struct FakeChannels {
    connectable: Mutex<HashSet<Role>>,
    fail_close: bool,
    reopened: Mutex<Vec<Role>>,
    log: EventLog,
}

impl FakeChannels {
    pub fn new(log: EventLog, fail_close: bool) -> Self {
        Self {
            connectable: Mutex::new(HashSet::new()),
            fail_close,
            reopened: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn set_connectable(&self, role: Role) {
        self.connectable.lock().unwrap().insert(role);
    }

    pub fn reopened(&self) -> Vec<Role> {
        self.reopened.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelMultiplexer for FakeChannels {
    fn is_connectable(&self, role: Role) -> bool {
        self.connectable.lock().unwrap().contains(&role)
    }

    fn reopen(&self, role: Role) {
        self.log.push(format!("reopen {role}"));
        self.reopened.lock().unwrap().push(role);
    }

    async fn close(&self, role: Role) -> Result<()> {
        self.log.push(format!("close channel {role}"));
        if self.fail_close {
            return Err(AgentError::Channel {
                role,
                reason: "multiplexer busy".to_string(),
            });
        }
        self.connectable.lock().unwrap().remove(&role);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub orchestrator: Arc<PairingOrchestrator>,
    pub prefs: Preferences,
    pub store: Arc<MemoryPreferences>,
    pub records: Arc<MemoryRecordStore>,
    pub channels: Arc<FakeChannels>,
    pub transport: Arc<FakeTransport>,
    pub log: EventLog,
}

pub struct HarnessBuilder {
    role: Role,
    behavior: Behavior,
    delay: Duration,
    timeout: Duration,
    fail_close: bool,
    store: Arc<MemoryPreferences>,
}

impl Harness {
    pub fn builder(role: Role) -> HarnessBuilder {
        HarnessBuilder {
            role,
            behavior: Behavior::Reply(ControlMessage::AuthTokenOk),
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            fail_close: false,
            store: Arc::new(MemoryPreferences::new()),
        }
    }

    pub fn reports(&self) -> broadcast::Receiver<PipelineReport> {
        self.orchestrator.subscribe_reports()
    }
}

impl HarnessBuilder {
    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Use a pre-populated preference store.
    pub fn store(mut self, store: MemoryPreferences) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn build(self) -> Harness {
        let log = EventLog::default();
        let prefs = Preferences::new(self.store.clone());
        let records = MemoryRecordStore::new_shared();
        let channels = Arc::new(FakeChannels::new(log.clone(), self.fail_close));
        let transport =
            Arc::new(FakeTransport::new(self.behavior, log.clone()).with_delay(self.delay));

        let handshake = HandshakeClient::new(
            transport.clone(),
            self.timeout,
            CancellationToken::new(),
        );
        let registrar = BootstrapRegistrar::new(
            self.role,
            prefs.clone(),
            records.clone(),
            Some("127.0.0.1".to_string()),
            3000,
        );

        let orchestrator = Arc::new(PairingOrchestrator::new(
            self.role,
            prefs.clone(),
            records.clone(),
            channels.clone(),
            handshake,
            registrar,
        ));

        Harness {
            orchestrator,
            prefs,
            store: self.store,
            records,
            channels,
            transport,
            log,
        }
    }
}

/// Wait for the next pipeline report, failing the test after a while.
pub async fn next_report(rx: &mut broadcast::Receiver<PipelineReport>) -> PipelineReport {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a pipeline report")
        .expect("report stream closed")
}
