//! Dispatcher
//!
//! Accepts operations from any number of callers through one bounded intake
//! channel and routes each to the worker owning its routing key, creating the
//! worker when none is registered.
//!
//! ## Routing vs. retirement
//! The registry is a `DashMap<RoutingKey, WorkerHandle>`. The dispatch loop
//! enqueues while holding the entry guard for the key; a retiring worker
//! removes its entry with `remove_if`, conditioned on its own id and an empty
//! queue, under the same shard lock. An operation is therefore either queued
//! to a worker that will see it, or finds the entry gone and gets a new worker.

use super::completion::Completion;
use super::types::{Operation, OperationKind, RoutingKey};
use super::worker::KeyWorker;
use crate::error::StoreError;
use crate::model::Entity;
use crate::store::RemoteStore;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// How a Delete reaches the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Call the store's native delete.
    #[default]
    Native,
    /// Overwrite the value with an empty JSON object, for stores without delete.
    Overwrite,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(DeletePolicy::Native),
            "overwrite" => Ok(DeletePolicy::Overwrite),
            other => Err(format!("unknown delete policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long an empty worker waits for new work before retiring.
    ///
    /// Short windows free memory sooner but respawn workers for keys touched
    /// in bursts; long windows keep one idle task (and its queue) per recently
    /// used key alive.
    pub idle_timeout: Duration,
    /// Capacity of the intake channel. Submitters wait when it is full.
    pub intake_capacity: usize,
    pub delete_policy: DeletePolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            intake_capacity: 1024,
            delete_policy: DeletePolicy::Native,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    pub active_workers: usize,
    pub workers_spawned: u64,
    pub workers_retired: u64,
}

pub(crate) struct WorkerHandle {
    pub id: u64,
    pub tx: mpsc::UnboundedSender<Operation>,
}

/// State shared between the dispatch loop and all key workers.
pub(crate) struct Shared {
    pub store: Arc<dyn RemoteStore>,
    pub config: DispatcherConfig,
    pub workers: DashMap<RoutingKey, WorkerHandle>,
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    next_worker_id: AtomicU64,
    pub spawned: AtomicU64,
    pub retired: AtomicU64,
}

type Routed = (RoutingKey, Operation);

/// Handle to the dispatch loop. Cheap to clone; all clones feed the same loop.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
    intake: mpsc::Sender<Routed>,
}

impl Dispatcher {
    /// Starts the dispatch loop on the current tokio runtime.
    pub fn new(store: Arc<dyn RemoteStore>, config: DispatcherConfig) -> Self {
        let (intake, rx) = mpsc::channel(config.intake_capacity.max(1));

        let shared = Arc::new(Shared {
            store,
            config,
            workers: DashMap::new(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            next_worker_id: AtomicU64::new(1),
            spawned: AtomicU64::new(0),
            retired: AtomicU64::new(0),
        });

        shared.tracker.spawn(
            dispatch_loop(shared.clone(), rx).instrument(tracing::info_span!("dispatcher")),
        );

        Self { shared, intake }
    }

    pub async fn get(&self, record: Arc<dyn Entity>) -> Completion {
        self.submit_kind(OperationKind::Get, record).await
    }

    pub async fn save(&self, record: Arc<dyn Entity>) -> Completion {
        self.submit_kind(OperationKind::Save, record).await
    }

    pub async fn delete(&self, record: Arc<dyn Entity>) -> Completion {
        self.submit_kind(OperationKind::Delete, record).await
    }

    async fn submit_kind(&self, kind: OperationKind, record: Arc<dyn Entity>) -> Completion {
        let (op, completion) = Operation::new(kind, record);
        self.submit(op).await;
        completion
    }

    /// Hands an operation to the dispatch loop.
    ///
    /// Waits only while the intake buffer is full. Operations that cannot be
    /// routed, or that arrive after shutdown began, are failed right away.
    pub async fn submit(&self, op: Operation) {
        if self.shared.shutdown.is_cancelled() {
            op.fulfill(Err(StoreError::ShuttingDown));
            return;
        }

        let routing_key = match RoutingKey::for_entity(op.record.as_ref()) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Rejected {} operation: {}", op.kind, e);
                op.fulfill(Err(e));
                return;
            }
        };

        if let Err(mpsc::error::SendError((_, op))) = self.intake.send((routing_key, op)).await {
            op.fulfill(Err(StoreError::ShuttingDown));
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            active_workers: self.shared.workers.len(),
            workers_spawned: self.shared.spawned.load(Ordering::SeqCst),
            workers_retired: self.shared.retired.load(Ordering::SeqCst),
        }
    }

    /// Stops intake and waits until every queued operation has completed and
    /// every worker has retired.
    pub async fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            tracing::info!("Dispatcher shutting down");
        }
        self.shared.shutdown.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        tracing::info!("Dispatcher stopped");
    }
}

async fn dispatch_loop(shared: Arc<Shared>, mut rx: mpsc::Receiver<Routed>) {
    tracing::info!("Dispatch loop started");

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            routed = rx.recv() => match routed {
                Some((routing_key, op)) => route(&shared, routing_key, op),
                None => {
                    tracing::info!("All dispatcher handles dropped, dispatch loop exiting");
                    return;
                }
            },
        }
    }

    // Anything accepted before shutdown still gets a worker.
    rx.close();
    let mut flushed = 0usize;
    while let Some((routing_key, op)) = rx.recv().await {
        route(&shared, routing_key, op);
        flushed += 1;
    }

    tracing::info!("Dispatch loop stopped ({} buffered operations routed)", flushed);
}

fn route(shared: &Arc<Shared>, routing_key: RoutingKey, op: Operation) {
    tracing::trace!("Routing {} for {}", op.kind, routing_key);

    match shared.workers.entry(routing_key) {
        Entry::Occupied(entry) => {
            if let Err(mpsc::error::SendError(op)) = entry.get().tx.send(op) {
                // A registered worker never closes its queue.
                tracing::error!("Queue for {} closed while registered", entry.key());
                op.fulfill(Err(StoreError::Aborted("worker queue closed".to_string())));
            }
        }
        Entry::Vacant(entry) => {
            let id = shared.next_worker_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            let routing_key = entry.key().clone();

            if let Err(mpsc::error::SendError(op)) = tx.send(op) {
                op.fulfill(Err(StoreError::Aborted("worker queue closed".to_string())));
                return;
            }
            entry.insert(WorkerHandle { id, tx });
            shared.spawned.fetch_add(1, Ordering::SeqCst);

            tracing::info!("Spawning worker {} for {}", id, routing_key);
            let span = tracing::info_span!("key_worker", routing_key = %routing_key, worker = id);
            let worker = KeyWorker::new(id, routing_key, rx, shared.clone());
            shared.tracker.spawn(worker.run().instrument(span));
        }
    }
}
