//! In-memory cache backend
//!
//! Default backend for tests, demos, and hosts that have not wired durable
//! storage yet. Entries vanish with the process, which still satisfies the
//! store contract: a cold cache is just a slow one.

use std::collections::HashMap;
use std::sync::RwLock;

use bridge_traits::error::{BridgeError, Result};

use super::store::{AudioCacheBackend, CacheEntry};

#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl AudioCacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BridgeError::StorageError("cache backend poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BridgeError::StorageError("cache backend poisoned".to_string()))?;
        entries.insert(entry.cache_key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BridgeError::StorageError("cache backend poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BridgeError::StorageError("cache backend poisoned".to_string()))?;
        Ok(entries.values().cloned().collect())
    }
}
