//! Key Worker
//!
//! One task per active routing key. It drains its private queue strictly in
//! arrival order, performs the store call for each operation, fulfills the
//! operation's completion, and retires once its queue has stayed empty for
//! the configured idle window (or immediately during shutdown).
//!
//! ## Lifecycle
//! 1. **Draining**: take the next queued operation and process it.
//! 2. **Waiting**: queue empty; wait for new work, the idle timer, or shutdown.
//! 3. **Retired**: unregistered from the dispatcher, task ends.
//!
//! A panic inside a store call is caught here, reported as `Aborted` for the
//! operation that caused it, and the worker keeps draining. A fatal store
//! error (revoked credentials) retires the worker at once; every operation
//! still queued is fulfilled with `Aborted`.

use super::dispatcher::{DeletePolicy, Shared};
use super::types::{Operation, OperationKind, RoutingKey};
use crate::error::StoreError;
use crate::model::Entity;
use crate::store::RemoteError;

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Body written by a Delete under `DeletePolicy::Overwrite`.
const EMPTY_PAYLOAD: &[u8] = b"{}";

pub(crate) struct KeyWorker {
    id: u64,
    routing_key: RoutingKey,
    rx: mpsc::UnboundedReceiver<Operation>,
    shared: Arc<Shared>,
}

/// Failure of a single processing step.
struct StepError {
    error: StoreError,
    fatal: bool,
}

impl From<StoreError> for StepError {
    fn from(error: StoreError) -> Self {
        Self {
            error,
            fatal: false,
        }
    }
}

enum Wake {
    Op(Option<Operation>),
    Idle,
    Shutdown,
}

impl KeyWorker {
    pub(crate) fn new(
        id: u64,
        routing_key: RoutingKey,
        rx: mpsc::UnboundedReceiver<Operation>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            id,
            routing_key,
            rx,
            shared,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::debug!("Worker started");

        loop {
            match self.rx.try_recv() {
                Ok(op) => {
                    if !self.handle(op).await {
                        return;
                    }
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("Worker queue disconnected");
                    return;
                }
            }

            if self.shared.shutdown.is_cancelled() {
                if self.try_retire("shutdown") {
                    return;
                }
                continue;
            }

            let wake = tokio::select! {
                op = self.rx.recv() => Wake::Op(op),
                _ = tokio::time::sleep(self.shared.config.idle_timeout) => Wake::Idle,
                _ = self.shared.shutdown.cancelled() => Wake::Shutdown,
            };

            match wake {
                Wake::Op(Some(op)) => {
                    if !self.handle(op).await {
                        return;
                    }
                }
                Wake::Op(None) => {
                    tracing::warn!("Worker queue disconnected");
                    return;
                }
                Wake::Idle => {
                    if self.try_retire("idle") {
                        return;
                    }
                }
                // Loop back: drain what is left, then retire.
                Wake::Shutdown => {}
            }
        }
    }

    /// Processes one operation. Returns false when the worker has retired.
    async fn handle(&mut self, op: Operation) -> bool {
        if op.is_cancelled() {
            tracing::debug!("Skipping cancelled {}", op.kind);
            op.fulfill(Err(StoreError::Cancelled));
            return true;
        }

        let kind = op.kind;
        let outcome = AssertUnwindSafe(self.execute(kind, op.record.as_ref()))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                tracing::trace!("{} completed", kind);
                op.fulfill(Ok(()));
                true
            }
            Ok(Err(StepError { error, fatal })) => {
                tracing::debug!("{} failed: {}", kind, error);
                op.fulfill(Err(error.clone()));
                if fatal {
                    self.abandon(&error);
                    return false;
                }
                true
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Worker fault during {}: {}", kind, message);
                op.fulfill(Err(StoreError::Aborted(format!("worker fault: {}", message))));
                true
            }
        }
    }

    async fn execute(&self, kind: OperationKind, record: &dyn Entity) -> Result<(), StepError> {
        let store = &self.shared.store;
        let collection = self.routing_key.collection();
        let key = self.routing_key.key();

        match kind {
            OperationKind::Get => {
                let bytes = store
                    .get(collection, key)
                    .await
                    .map_err(|e| self.remote_failure(e))?;
                record.decode_payload(&bytes)?;
            }
            OperationKind::Save => {
                let bytes = record.encode_payload()?;
                store
                    .put(collection, key, bytes)
                    .await
                    .map_err(|e| self.remote_failure(e))?;
            }
            OperationKind::Delete => {
                let result = match self.shared.config.delete_policy {
                    DeletePolicy::Native => store.delete(collection, key).await,
                    DeletePolicy::Overwrite => {
                        store.put(collection, key, EMPTY_PAYLOAD.to_vec()).await
                    }
                };
                result.map_err(|e| self.remote_failure(e))?;
            }
        }

        Ok(())
    }

    fn remote_failure(&self, err: RemoteError) -> StepError {
        let fatal = err.is_fatal();
        let error = match err {
            RemoteError::NotFound => StoreError::NotFound {
                collection: self.routing_key.collection().to_string(),
                key: self.routing_key.key().to_string(),
            },
            RemoteError::Transport(message) => StoreError::Transport(message),
            RemoteError::Unauthorized(message) => {
                StoreError::Transport(format!("unauthorized: {}", message))
            }
        };
        StepError { error, fatal }
    }

    /// Unregisters this worker if its queue is still empty.
    ///
    /// Runs under the registry shard lock the dispatcher holds while enqueueing,
    /// so no operation can slip in between the emptiness check and removal.
    fn try_retire(&mut self, reason: &str) -> bool {
        let id = self.id;
        let rx = &self.rx;
        let removed = self
            .shared
            .workers
            .remove_if(&self.routing_key, |_, handle| handle.id == id && rx.is_empty())
            .is_some();

        if removed {
            self.shared.retired.fetch_add(1, Ordering::SeqCst);
            tracing::info!("Worker retired ({})", reason);
            return true;
        }

        let registered = self
            .shared
            .workers
            .get(&self.routing_key)
            .is_some_and(|handle| handle.id == id);
        if !registered {
            tracing::warn!("Worker no longer registered, exiting");
            return true;
        }

        // Still registered and work arrived: keep draining.
        false
    }

    /// Unregisters unconditionally and aborts everything still queued.
    fn abandon(&mut self, cause: &StoreError) {
        let id = self.id;
        if self
            .shared
            .workers
            .remove_if(&self.routing_key, |_, handle| handle.id == id)
            .is_some()
        {
            self.shared.retired.fetch_add(1, Ordering::SeqCst);
        }

        self.rx.close();
        let mut abandoned = 0usize;
        while let Ok(op) = self.rx.try_recv() {
            op.fulfill(Err(StoreError::Aborted(format!(
                "worker for {} retired after fatal error: {}",
                self.routing_key, cause
            ))));
            abandoned += 1;
        }

        tracing::warn!(
            "Worker retired after fatal error ({}); {} queued operations abandoned",
            cause,
            abandoned
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
