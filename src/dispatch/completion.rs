//! Single-use completion signalling.
//!
//! Every submitted operation is split into a `Completer` (travels with the
//! operation to its key worker) and a `Completion` (returned to the caller).
//! The completer fulfills exactly once: `fulfill` consumes it, and a completer
//! dropped without being fulfilled reports `Aborted` instead of leaving the
//! caller waiting forever.

use crate::error::StoreError;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

pub type OpResult = Result<(), StoreError>;

/// Creates a linked completer/completion pair sharing one cancellation token.
pub fn completion_pair() -> (Completer, Completion) {
    let (tx, rx) = oneshot::channel();
    let cancel = CancellationToken::new();

    (
        Completer {
            tx: Some(tx),
            cancel: cancel.clone(),
        },
        Completion {
            rx,
            cancel,
            result: None,
        },
    )
}

/// Write side, owned by whoever currently holds the operation.
pub struct Completer {
    tx: Option<oneshot::Sender<OpResult>>,
    cancel: CancellationToken,
}

impl Completer {
    pub fn fulfill(mut self, result: OpResult) {
        if let Some(tx) = self.tx.take() {
            // The caller may have dropped its Completion; nothing to report then.
            let _ = tx.send(result);
        }
    }

    /// True once the caller has withdrawn the operation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::warn!("operation dropped before completion");
            let _ = tx.send(Err(StoreError::Aborted(
                "operation dropped before completion".to_string(),
            )));
        }
    }
}

/// Read side, handed to the submitter.
///
/// Await it for the outcome, or poll it with `try_result`.
pub struct Completion {
    rx: oneshot::Receiver<OpResult>,
    cancel: CancellationToken,
    result: Option<OpResult>,
}

impl Completion {
    /// Withdraws the operation. If it is still queued it resolves to
    /// `Cancelled` when its worker reaches it; an operation already running
    /// finishes normally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Non-blocking check. Returns `None` while the operation is pending.
    pub fn try_result(&mut self) -> Option<OpResult> {
        if self.result.is_none() {
            self.result = match self.rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Err(closed_error())),
            };
        }
        self.result.clone()
    }
}

impl Future for Completion {
    type Output = OpResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = &this.result {
            return Poll::Ready(result.clone());
        }

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(received) => {
                let result = received.unwrap_or_else(|_| Err(closed_error()));
                this.result = Some(result.clone());
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn closed_error() -> StoreError {
    StoreError::Aborted("completion channel closed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fulfill_delivers_result() {
        let (completer, completion) = completion_pair();

        completer.fulfill(Err(StoreError::Cancelled));

        assert_eq!(completion.await, Err(StoreError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_completer_reports_aborted() {
        let (completer, completion) = completion_pair();

        drop(completer);

        assert!(matches!(completion.await, Err(StoreError::Aborted(_))));
    }

    #[test]
    fn test_try_result_is_pending_then_sticky() {
        let (completer, mut completion) = completion_pair();

        assert_eq!(completion.try_result(), None);

        completer.fulfill(Ok(()));

        assert_eq!(completion.try_result(), Some(Ok(())));
        assert_eq!(completion.try_result(), Some(Ok(())));
    }

    #[test]
    fn test_cancel_is_visible_to_completer() {
        let (completer, completion) = completion_pair();

        completion.cancel();

        assert!(completer.is_cancelled());
        assert!(completion.is_cancelled());
    }
}
