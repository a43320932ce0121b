//! Remote Store Boundary
//!
//! The data-access layer never talks to storage directly; key workers call a
//! `RemoteStore`. The trait mirrors the remote service's three calls and keeps
//! transport concerns (HTTP, auth, timeouts) out of the dispatcher.
//!
//! ## Implementations
//! - **`memory`**: `MemoryStore`, an in-process store (tests, local runs).
//! - **`http`**: `HttpStore`, a REST client for an Orchestrate-style service.

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a remote store client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("key not found")]
    NotFound,

    #[error("{0}")]
    Transport(String),

    /// The client's credentials were refused. Retrying with the same client is
    /// pointless, so workers treat this as fatal.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl RemoteError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }
}

/// Client for the remote key-value service.
///
/// Values are opaque bytes; collections are namespaces derived from a record's
/// type tag.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn get(&self, collection: &str, key: &str) -> Result<Vec<u8>, RemoteError>;

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), RemoteError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests;
