use super::naming::collection_name;
use crate::error::StoreError;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Capability required of a record payload: encode to bytes, decode from bytes.
///
/// Implemented for every serde type via JSON, which is the wire format the
/// remote store expects.
pub trait Serializable: Send + Sync + 'static {
    fn encode(&self) -> Result<Vec<u8>, StoreError>;

    fn decode(bytes: &[u8]) -> Result<Self, StoreError>
    where
        Self: Sized;
}

impl<T> Serializable for T
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A keyed entity stored in the collection derived from its type tag.
///
/// `key` and `kind` never change after construction. The payload sits behind a
/// lock because a queued Get may overwrite it while the caller still holds the
/// record.
pub struct Record<P> {
    key: String,
    kind: String,
    payload: RwLock<P>,
}

impl<P: Serializable> Record<P> {
    pub fn new(kind: impl Into<String>, key: impl Into<String>, payload: P) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            payload: RwLock::new(payload),
        }
    }

    /// Convenience constructor returning the `Arc` the dispatcher expects.
    pub fn shared(kind: impl Into<String>, key: impl Into<String>, payload: P) -> Arc<Self> {
        Arc::new(Self::new(kind, key, payload))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn collection(&self) -> Result<String, StoreError> {
        collection_name(&self.kind)
    }

    pub fn payload(&self) -> RwLockReadGuard<'_, P> {
        self.payload.read()
    }

    pub fn set_payload(&self, payload: P) {
        *self.payload.write() = payload;
    }

    /// Runs `f` with exclusive access to the payload.
    pub fn update<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.payload.write())
    }

    pub fn snapshot(&self) -> P
    where
        P: Clone,
    {
        self.payload.read().clone()
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for Record<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("payload", &*self.payload.read())
            .finish()
    }
}

/// Object-safe view of a record, independent of its payload type.
///
/// The dispatcher and key workers only ever see `Arc<dyn Entity>`.
pub trait Entity: Send + Sync {
    fn key(&self) -> &str;

    fn kind(&self) -> &str;

    fn encode_payload(&self) -> Result<Vec<u8>, StoreError>;

    /// Replaces the payload with the decoded bytes. On error the payload is
    /// left as it was.
    fn decode_payload(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

impl<P: Serializable> Entity for Record<P> {
    fn key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn encode_payload(&self) -> Result<Vec<u8>, StoreError> {
        self.payload.read().encode()
    }

    fn decode_payload(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let decoded = P::decode(bytes)?;
        *self.payload.write() = decoded;
        Ok(())
    }
}
