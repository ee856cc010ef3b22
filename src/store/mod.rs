//! State store - key/value persistence for aggregation records
//!
//! The engine only needs `get`/`set` of opaque string blobs. A missing key is
//! a normal value (the empty string), never an error.

mod rest;

pub use rest::RestStore;

use anyhow::bail;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::error::StoreError;

/// Key/value store holding serialized aggregation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the blob stored under `key`, or an empty string when absent
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Store `value` under `key`. Callers do not read the write back.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local store, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing blob
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(key.into(), value.into());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Build the configured store
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.store.kind.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        "rest" => Arc::new(RestStore::new(
            &config.store.endpoint,
            config.store.token.clone(),
            config.store_timeout(),
        )?),
        other => bail!("Unknown store kind: {}", other),
    };
    Ok(store)
}
