//! Pairing orchestrator.
//!
//! Subscribes to "record appeared" notifications, filters them, and feeds
//! each peer record to the adopter of its role. Every role owns one worker
//! task draining a FIFO queue, so pipelines for the same role never overlap
//! while different roles progress independently.
//!
//! A pipeline is: adopt the record, then make sure the channel to that role
//! is connectable, requesting a reopen when it is not.

use std::collections::HashMap;
use std::sync::Arc;

use tether_engine::{
    classify, AdoptionOutcome, DeviceRecord, Dispatch, Preferences, RecordKey, Role,
};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adopt::{Adopter, ClientAdopter, CloudAdopter, ServerAdoptionController};
use crate::channels::ChannelMultiplexer;
use crate::error::{AgentError, Result};
use crate::handshake::HandshakeClient;
use crate::record_store::RecordStore;
use crate::registrar::BootstrapRegistrar;

/// Buffered pipeline reports per subscriber.
const REPORT_BUFFER: usize = 64;

/// Result of one finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Role of the observed record
    pub role: Role,
    /// What the adopter did, or why it failed
    pub outcome: std::result::Result<AdoptionOutcome, String>,
}

/// A record queued for its role's worker.
struct WorkItem {
    record: DeviceRecord,
    done: Option<oneshot::Sender<PipelineReport>>,
}

/// Routes records to per-role queues.
#[derive(Clone)]
struct Router {
    local_role: Role,
    queues: HashMap<Role, mpsc::UnboundedSender<WorkItem>>,
}

impl Router {
    /// Queue `record` if it is a dispatchable peer record.
    ///
    /// Returns `false` when the record was filtered out.
    fn route(&self, record: DeviceRecord, done: Option<oneshot::Sender<PipelineReport>>) -> bool {
        let role = match classify(self.local_role, &record) {
            Dispatch::Handle(role) => role,
            Dispatch::Ignore(reason) => {
                tracing::trace!(kind = %record.kind, role = %record.role, reason = ?reason, "Record ignored");
                return false;
            }
        };

        let Some(queue) = self.queues.get(&role) else {
            tracing::warn!(role = %role, "No handler registered for role");
            return false;
        };

        if queue.send(WorkItem { record, done }).is_err() {
            tracing::warn!(role = %role, "Worker stopped; record dropped");
            return false;
        }
        true
    }
}

struct Running {
    router: Router,
    pump: JoinHandle<()>,
    pump_cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

enum Lifecycle {
    Idle,
    Running(Running),
    Stopped,
}

/// Top-level coordinator of pairing and bootstrap.
pub struct PairingOrchestrator {
    local_role: Role,
    records: Arc<dyn RecordStore>,
    channels: Arc<dyn ChannelMultiplexer>,
    handlers: HashMap<Role, Arc<dyn Adopter>>,
    registrar: BootstrapRegistrar,
    shutdown: CancellationToken,
    reports: broadcast::Sender<PipelineReport>,
    lifecycle: Mutex<Lifecycle>,
}

impl PairingOrchestrator {
    /// Wire the standard handlers: client records are no-ops, server records
    /// go to the [`ServerAdoptionController`], cloud records to the
    /// [`CloudAdopter`].
    ///
    /// Stopping the orchestrator cancels the handshake client's shutdown
    /// token.
    pub fn new(
        local_role: Role,
        prefs: Preferences,
        records: Arc<dyn RecordStore>,
        channels: Arc<dyn ChannelMultiplexer>,
        handshake: HandshakeClient,
        registrar: BootstrapRegistrar,
    ) -> Self {
        let shutdown = handshake.shutdown_token().clone();

        let mut handlers: HashMap<Role, Arc<dyn Adopter>> = HashMap::new();
        handlers.insert(Role::Client, Arc::new(ClientAdopter));
        handlers.insert(
            Role::Server,
            Arc::new(ServerAdoptionController::new(
                local_role,
                prefs.clone(),
                channels.clone(),
                handshake,
            )),
        );
        handlers.insert(Role::Cloud, Arc::new(CloudAdopter::new(prefs)));

        let (reports, _) = broadcast::channel(REPORT_BUFFER);

        Self {
            local_role,
            records,
            channels,
            handlers,
            registrar,
            shutdown,
            reports,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Stream of finished pipelines.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<PipelineReport> {
        self.reports.subscribe()
    }

    /// Start the workers, replay unconnected peers, subscribe to
    /// notifications and register the bootstrap records.
    ///
    /// Starting a running orchestrator does nothing. A stopped orchestrator
    /// cannot be restarted. If registration fails the orchestrator is
    /// stopped before the error is returned.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Running(_) => return Ok(()),
            Lifecycle::Stopped => return Err(AgentError::ShutDown),
            Lifecycle::Idle => {}
        }

        let (router, workers) = self.spawn_workers();

        // Pairing data from a previous run whose channel never came up.
        for role in [Role::Server, Role::Cloud] {
            if role == self.local_role || self.channels.is_connectable(role) {
                continue;
            }
            if let Some(record) = self.records.get_record(&RecordKey::own_self(role)) {
                tracing::info!(role = %role, "Replaying stored record for unconnected channel");
                router.route(record, None);
            }
        }

        let pump_cancel = CancellationToken::new();
        let pump = tokio::spawn(pump_notifications(
            self.records.subscribe(),
            router.clone(),
            pump_cancel.clone(),
        ));

        *lifecycle = Lifecycle::Running(Running {
            router,
            pump,
            pump_cancel,
            workers,
        });
        drop(lifecycle);

        tracing::info!(role = %self.local_role, "Pairing orchestrator started");

        if let Err(e) = self.registrar.run() {
            tracing::error!(role = %self.local_role, "Bootstrap registration failed: {}", e);
            self.stop().await?;
            return Err(e);
        }
        Ok(())
    }

    /// Unsubscribe, cancel in-flight handshakes and wait for the workers.
    pub async fn stop(&self) -> Result<()> {
        let running = {
            let mut lifecycle = self.lifecycle.lock().await;
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                Lifecycle::Idle | Lifecycle::Stopped => {
                    self.shutdown.cancel();
                    return Ok(());
                }
            }
        };

        running.pump_cancel.cancel();
        self.shutdown.cancel();

        // Dropping every router closes the queues once the pump is gone.
        drop(running.router);
        if let Err(e) = running.pump.await {
            tracing::warn!("Notification pump ended abnormally: {}", e);
        }
        for worker in running.workers {
            if let Err(e) = worker.await {
                tracing::warn!("Role worker ended abnormally: {}", e);
            }
        }

        tracing::info!(role = %self.local_role, "Pairing orchestrator stopped");
        Ok(())
    }

    /// Run `record` through the same filter and queue as a notification and
    /// wait for its pipeline.
    ///
    /// Returns `None` when the record is filtered out.
    pub async fn dispatch(&self, record: DeviceRecord) -> Result<Option<PipelineReport>> {
        let router = match &*self.lifecycle.lock().await {
            Lifecycle::Running(running) => running.router.clone(),
            _ => return Err(AgentError::NotRunning),
        };

        let (done, report) = oneshot::channel();
        if !router.route(record, Some(done)) {
            return Ok(None);
        }
        drop(router);

        report.await.map(Some).map_err(|_| AgentError::NotRunning)
    }

    fn spawn_workers(&self) -> (Router, Vec<JoinHandle<()>>) {
        let mut queues = HashMap::new();
        let mut workers = Vec::new();

        for (&role, handler) in &self.handlers {
            if role.is_sentinel() || role == self.local_role {
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            queues.insert(role, tx);
            workers.push(tokio::spawn(run_worker(
                role,
                handler.clone(),
                self.channels.clone(),
                self.reports.clone(),
                rx,
            )));
        }

        let router = Router {
            local_role: self.local_role,
            queues,
        };
        (router, workers)
    }
}

/// Forward notifications to the router until cancelled or the store closes.
async fn pump_notifications(
    mut rx: broadcast::Receiver<DeviceRecord>,
    router: Router,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            notification = rx.recv() => match notification {
                Ok(record) => {
                    router.route(record, None);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed = missed, "Record notifications lagged; some were skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Process one role's queue, one pipeline at a time.
async fn run_worker(
    role: Role,
    handler: Arc<dyn Adopter>,
    channels: Arc<dyn ChannelMultiplexer>,
    reports: broadcast::Sender<PipelineReport>,
    mut queue: mpsc::UnboundedReceiver<WorkItem>,
) {
    while let Some(item) = queue.recv().await {
        let outcome = match handler.adopt(&item.record).await {
            Ok(outcome) => {
                tracing::debug!(role = %role, outcome = outcome.label(), "Record adopted");
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(role = %role, "Adoption failed: {}", e);
                Err(e.to_string())
            }
        };

        if !channels.is_connectable(role) {
            channels.reopen(role);
        }

        let report = PipelineReport { role, outcome };
        let _ = reports.send(report.clone());
        if let Some(done) = item.done {
            let _ = done.send(report);
        }
    }

    tracing::debug!(role = %role, "Role worker finished");
}
