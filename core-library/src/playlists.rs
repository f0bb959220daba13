//! Named playlist persistence
//!
//! Playlists are stored as JSON arrays in the host's [`SettingsStore`] under
//! a key prefix, one key per playlist. That keeps them in the same durable
//! storage as preferences without requiring a database bridge.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use bridge_traits::SettingsStore;

use crate::error::{LibraryError, Result};
use crate::models::Track;

/// Key prefix separating playlists from other settings.
const PLAYLIST_KEY_PREFIX: &str = "playlist.";

/// Named save/load/delete/list of track arrays over the settings store.
pub struct PlaylistStore {
    settings: Arc<dyn SettingsStore>,
}

impl PlaylistStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Save a playlist under a name, replacing any playlist with that name.
    #[instrument(skip(self, tracks), fields(track_count = tracks.len()))]
    pub async fn save(&self, name: &str, tracks: &[Track]) -> Result<()> {
        let name = normalize_name(name)?;
        if tracks.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "tracks".to_string(),
                message: "cannot save an empty playlist".to_string(),
            });
        }

        let json = serde_json::to_string(tracks)?;
        self.settings
            .set_string(&storage_key(&name), &json)
            .await?;
        debug!(name = %name, "playlist saved");
        Ok(())
    }

    /// Load a playlist by name. Returns `None` when no playlist has that
    /// name. A corrupt stored value is treated as absent rather than fatal.
    #[instrument(skip(self))]
    pub async fn load(&self, name: &str) -> Result<Option<Vec<Track>>> {
        let name = normalize_name(name)?;
        let Some(json) = self.settings.get_string(&storage_key(&name)).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(tracks) => Ok(Some(tracks)),
            Err(e) => {
                warn!(name = %name, error = %e, "stored playlist is corrupt; ignoring");
                Ok(None)
            }
        }
    }

    /// Delete a saved playlist. Deleting an unknown name is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        self.settings.delete(&storage_key(&name)).await?;
        debug!(name = %name, "playlist deleted");
        Ok(())
    }

    /// List the names of all saved playlists, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .settings
            .list_keys()
            .await?
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(PLAYLIST_KEY_PREFIX)
                    .map(|name| name.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

fn storage_key(name: &str) -> String {
    format!("{}{}", PLAYLIST_KEY_PREFIX, name)
}

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::InvalidInput {
            field: "name".to_string(),
            message: "playlist name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::storage::MemorySettingsStore;

    fn store() -> PlaylistStore {
        PlaylistStore::new(Arc::new(MemorySettingsStore::new()))
    }

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("Hello there.", "안녕하세요."),
            Track::new("Good morning.", "좋은 아침이에요."),
        ]
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let playlists = store();
        playlists.save("daily", &tracks()).await.unwrap();

        let loaded = playlists.load("daily").await.unwrap().unwrap();
        assert_eq!(loaded, tracks());
    }

    #[tokio::test]
    async fn load_unknown_name_is_none() {
        let playlists = store();
        assert!(playlists.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_existing() {
        let playlists = store();
        playlists.save("daily", &tracks()).await.unwrap();

        let replacement = vec![Track::new("Bye.", "잘 가.")];
        playlists.save("daily", &replacement).await.unwrap();

        let loaded = playlists.load("daily").await.unwrap().unwrap();
        assert_eq!(loaded, replacement);
    }

    #[tokio::test]
    async fn delete_then_list() {
        let playlists = store();
        playlists.save("one", &tracks()).await.unwrap();
        playlists.save("two", &tracks()).await.unwrap();

        playlists.delete("one").await.unwrap();
        // Deleting again is fine.
        playlists.delete("one").await.unwrap();

        assert_eq!(playlists.list().await.unwrap(), vec!["two".to_string()]);
    }

    #[tokio::test]
    async fn list_ignores_unrelated_settings() {
        let settings = Arc::new(MemorySettingsStore::new());
        settings.set_string("tts_mode", "auto").await.unwrap();
        let playlists = PlaylistStore::new(settings);

        playlists.save("b", &tracks()).await.unwrap();
        playlists.save("a", &tracks()).await.unwrap();

        assert_eq!(
            playlists.list().await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let playlists = store();
        assert!(playlists.save("  ", &tracks()).await.is_err());
        assert!(playlists.save("daily", &[]).await.is_err());
    }

    #[tokio::test]
    async fn corrupt_stored_playlist_reads_as_absent() {
        let settings = Arc::new(MemorySettingsStore::new());
        settings
            .set_string("playlist.broken", "not json at all")
            .await
            .unwrap();
        let playlists = PlaylistStore::new(settings);

        assert!(playlists.load("broken").await.unwrap().is_none());
    }
}
