use super::{RemoteError, RemoteStore};

use async_trait::async_trait;
use dashmap::DashMap;

/// In-process `RemoteStore`.
///
/// Structure: `Collection -> Key -> bytes`.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, collection: &str, key: &str) -> bool {
        self.collections
            .get(collection)
            .map(|c| c.contains_key(key))
            .unwrap_or(false)
    }

    /// Raw bytes under a key, bypassing the async interface.
    pub fn raw(&self, collection: &str, key: &str) -> Option<Vec<u8>> {
        self.collections
            .get(collection)
            .and_then(|c| c.get(key).map(|v| v.value().clone()))
    }

    pub fn entry_count(&self) -> usize {
        self.collections.iter().map(|c| c.value().len()).sum()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Vec<u8>, RemoteError> {
        self.raw(collection, key).ok_or(RemoteError::NotFound)
    }

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), RemoteError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError> {
        if let Some(c) = self.collections.get(collection) {
            c.remove(key);
        }
        Ok(())
    }
}
