//! Error taxonomy for record operations.
//!
//! Every operation submitted to the dispatcher resolves to `Ok(())` or exactly
//! one `StoreError`, delivered through its completion handle.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The remote store has no value under this key.
    #[error("{collection}/{key} not found")]
    NotFound { collection: String, key: String },

    /// The payload could not be serialized or deserialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The remote call failed (network, auth, quota).
    #[error("transport error: {0}")]
    Transport(String),

    /// The operation was discarded because its worker faulted or retired.
    #[error("operation aborted: {0}")]
    Aborted(String),

    /// The caller withdrew the operation before it was processed.
    #[error("operation cancelled")]
    Cancelled,

    /// Submitted after shutdown began.
    #[error("system shutting down")]
    ShuttingDown,

    /// The record cannot be routed (bad type tag or key).
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Encoding(err.to_string())
    }
}
