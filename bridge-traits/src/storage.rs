//! Settings Storage Abstraction
//!
//! Key-value preferences storage backed by whatever the host platform offers
//! (localStorage, UserDefaults, SharedPreferences, a config file). The core
//! keeps player preferences and named playlists here; synthesized audio goes
//! through the separate audio cache backend, never through settings.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSendSync;

/// Key-value settings storage trait.
///
/// Values are stored as strings; the typed helpers parse on the way out and
/// return `None` for keys that are absent or unparseable.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_preferences(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("tts_mode", "auto").await?;
///     store.set_f64("playback_speed", 1.25).await?;
///     Ok(())
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SettingsStore: PlatformSendSync {
    /// Store a string value.
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all setting keys.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Store a boolean value.
    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_string(key, if value { "true" } else { "false" })
            .await
    }

    /// Retrieve a boolean value.
    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self
            .get_string(key)
            .await?
            .and_then(|v| v.parse::<bool>().ok()))
    }

    /// Store a floating-point value.
    async fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    /// Retrieve a floating-point value.
    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        Ok(self
            .get_string(key)
            .await?
            .and_then(|v| v.parse::<f64>().ok()))
    }

    /// Check if a setting exists.
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// Clear all settings.
    async fn clear_all(&self) -> Result<()> {
        for key in self.list_keys().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

/// In-memory settings store for tests, demos, and hosts without durable
/// preferences. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| BridgeError::StorageError("settings store poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| BridgeError::StorageError("settings store poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| BridgeError::StorageError("settings store poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| BridgeError::StorageError("settings store poisoned".to_string()))?;
        Ok(values.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn string_round_trip() {
        let store = MemorySettingsStore::new();
        store.set_string("tts_mode", "auto").await.unwrap();
        assert_eq!(
            store.get_string("tts_mode").await.unwrap(),
            Some("auto".to_string())
        );
        assert_eq!(store.get_string("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn typed_helpers_parse_and_reject() {
        let store = MemorySettingsStore::new();
        store.set_f64("playback_speed", 1.5).await.unwrap();
        store.set_bool("repeat", true).await.unwrap();

        assert_eq!(store.get_f64("playback_speed").await.unwrap(), Some(1.5));
        assert_eq!(store.get_bool("repeat").await.unwrap(), Some(true));

        // Unparseable values read as absent rather than erroring.
        store.set_string("playback_speed", "fast").await.unwrap();
        assert_eq!(store.get_f64("playback_speed").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemorySettingsStore::new();
        store.set_string("a", "1").await.unwrap();
        store.set_string("b", "2").await.unwrap();

        store.delete("a").await.unwrap();
        assert!(!store.has_key("a").await.unwrap());
        // Deleting again is fine.
        store.delete("a").await.unwrap();

        store.clear_all().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
