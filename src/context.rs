//! Application context.
//!
//! `DataLayer` is built once at startup and passed (usually as
//! `Arc<DataLayer>`) to everything that reads or writes records. It owns the
//! remote store client and the dispatcher, so there is no process-wide state.

use crate::config::Config;
use crate::dispatch::{Completion, Dispatcher, DispatcherConfig, DispatcherStats};
use crate::model::Entity;
use crate::store::{HttpStore, RemoteStore};

use anyhow::{Context, Result};
use std::sync::Arc;

pub struct DataLayer {
    store: Arc<dyn RemoteStore>,
    dispatcher: Dispatcher,
}

impl DataLayer {
    /// Starts a dispatcher over `store`. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn RemoteStore>, config: DispatcherConfig) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), config);
        Self { store, dispatcher }
    }

    /// Connects to the configured remote store over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = HttpStore::new(&config.store_url, &config.api_key, config.store_timeout)
            .context("failed to build remote store client")?;

        tracing::info!(
            "Remote store at {} (idle timeout {:?}, intake {})",
            config.store_url,
            config.dispatcher.idle_timeout,
            config.dispatcher.intake_capacity
        );

        Ok(Self::new(Arc::new(store), config.dispatcher.clone()))
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Loads the stored payload into `record`.
    pub async fn get(&self, record: Arc<dyn Entity>) -> Completion {
        self.dispatcher.get(record).await
    }

    /// Writes `record`'s payload as it is when the operation runs.
    pub async fn save(&self, record: Arc<dyn Entity>) -> Completion {
        self.dispatcher.save(record).await
    }

    pub async fn delete(&self, record: Arc<dyn Entity>) -> Completion {
        self.dispatcher.delete(record).await
    }

    pub fn stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }

    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}
