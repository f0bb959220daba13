//! Audio cache store
//!
//! Expiry, LRU bookkeeping, and fault policy live here; the raw key-value
//! persistence is behind [`AudioCacheBackend`] so hosts can plug in whatever
//! durable storage the platform offers (IndexedDB, files, SQLite). The
//! store is opened once at session start and never explicitly torn down.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use bridge_traits::platform::PlatformSendSync;
use bridge_traits::Clock;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};

use super::config::CacheConfig;

/// One cached synthesized clip.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Fingerprint of the (text, voice) pair.
    pub cache_key: String,
    /// Encoded audio at 1.0x speed.
    pub audio: Bytes,
    /// Clip duration in seconds. Starts as the provider estimate and is
    /// corrected in place once real playback measures it.
    pub duration_seconds: f64,
    /// Voice the clip was synthesized with.
    pub voice_id: String,
    /// Leading characters of the source text, for inspection.
    pub text_preview: String,
    /// When the clip was synthesized.
    pub created_at: DateTime<Utc>,
    /// When the clip was last served from cache.
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    pub fn size_bytes(&self) -> u64 {
        self.audio.len() as u64
    }
}

/// Raw persistence for cache entries.
///
/// Implementations provide per-entry atomic read-modify-write; the store
/// never coordinates concurrent access beyond that.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioCacheBackend: PlatformSendSync {
    /// Fetch an entry by key.
    async fn get(&self, key: &str) -> bridge_traits::error::Result<Option<CacheEntry>>;

    /// Insert or replace an entry.
    async fn put(&self, entry: CacheEntry) -> bridge_traits::error::Result<()>;

    /// Delete an entry. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> bridge_traits::error::Result<()>;

    /// All stored entries, in no particular order.
    async fn entries(&self) -> bridge_traits::error::Result<Vec<CacheEntry>>;
}

/// Size-bounded, expiring store of synthesized audio.
///
/// Any backend fault degrades to a cache miss (reads) or a dropped write:
/// the network can always re-synthesize, so cache trouble must never stop
/// playback.
pub struct AudioCacheStore {
    backend: Arc<dyn AudioCacheBackend>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    events: Option<EventBus>,
}

impl AudioCacheStore {
    pub fn new(backend: Arc<dyn AudioCacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            config: CacheConfig::default(),
            events: None,
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// One-time startup work: sweep entries past their expiry.
    pub async fn initialize(&self) {
        let swept = self.sweep_expired().await;
        if swept > 0 {
            debug!(swept, "expired cache entries removed at startup");
        }
    }

    /// Look up a clip. Returns the entry when present and younger than the
    /// TTL; an expired entry is deleted on the way out. A hit refreshes
    /// `last_accessed` before returning.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = match self.backend.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; treating as miss");
                return None;
            }
        };

        let Some(mut entry) = entry else {
            self.emit(CacheEvent::Miss {
                cache_key: key.to_string(),
            });
            return None;
        };

        let now = self.clock.now();
        let age = now.signed_duration_since(entry.created_at);
        let ttl = chrono::Duration::from_std(self.config.entry_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(30));

        if age >= ttl {
            debug!(key, age_days = age.num_days(), "cache entry expired");
            if let Err(e) = self.backend.delete(key).await {
                warn!(key, error = %e, "failed to delete expired entry");
            }
            self.emit(CacheEvent::Miss {
                cache_key: key.to_string(),
            });
            return None;
        }

        entry.last_accessed = now;
        if let Err(e) = self.backend.put(entry.clone()).await {
            // The hit still counts; only the recency bookkeeping was lost.
            warn!(key, error = %e, "failed to refresh last_accessed");
        }

        self.emit(CacheEvent::Hit {
            cache_key: key.to_string(),
            size_bytes: entry.size_bytes(),
        });
        Some(entry)
    }

    /// Store a freshly synthesized clip, evicting least-recently-accessed
    /// entries first when the budget would overflow. The insert itself is
    /// unconditional: even a clip larger than the entire budget is admitted
    /// (alone).
    #[instrument(skip(self, audio, text), fields(size = audio.len()))]
    pub async fn put(
        &self,
        key: &str,
        audio: Bytes,
        duration_seconds: f64,
        voice_id: &str,
        text: &str,
    ) {
        let now = self.clock.now();
        let entry = CacheEntry {
            cache_key: key.to_string(),
            audio,
            duration_seconds,
            voice_id: voice_id.to_string(),
            text_preview: text.chars().take(self.config.preview_chars).collect(),
            created_at: now,
            last_accessed: now,
        };
        let new_size = entry.size_bytes();

        self.evict_for(new_size).await;

        if let Err(e) = self.backend.put(entry).await {
            warn!(key, error = %e, "failed to store synthesized audio");
            return;
        }

        self.emit(CacheEvent::Stored {
            cache_key: key.to_string(),
            size_bytes: new_size,
        });
    }

    /// In-place duration correction once real playback has measured the
    /// clip. No-op when the key is absent.
    pub async fn update_duration(&self, key: &str, duration_seconds: f64) {
        let entry = match self.backend.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                warn!(key, error = %e, "cache read failed during duration update");
                return;
            }
        };

        let corrected = CacheEntry {
            duration_seconds,
            ..entry
        };
        if let Err(e) = self.backend.put(corrected).await {
            warn!(key, error = %e, "failed to update cached duration");
        }
    }

    /// Delete all entries past their expiry. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let entries = match self.backend.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache sweep could not list entries");
                return 0;
            }
        };

        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.config.entry_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(30));

        let mut swept = 0;
        for entry in entries {
            if now.signed_duration_since(entry.created_at) >= ttl {
                if let Err(e) = self.backend.delete(&entry.cache_key).await {
                    warn!(key = %entry.cache_key, error = %e, "failed to sweep entry");
                } else {
                    swept += 1;
                }
            }
        }

        if swept > 0 {
            self.emit(CacheEvent::ExpiredSwept { entries: swept });
        }
        swept
    }

    /// Total bytes currently stored.
    pub async fn total_size(&self) -> u64 {
        match self.backend.entries().await {
            Ok(entries) => entries.iter().map(CacheEntry::size_bytes).sum(),
            Err(e) => {
                warn!(error = %e, "cache size could not be computed");
                0
            }
        }
    }

    /// Evict oldest-accessed entries until `incoming` bytes fit in the
    /// budget, or until nothing is left to evict.
    async fn evict_for(&self, incoming: u64) {
        let mut entries = match self.backend.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "eviction scan failed; inserting anyway");
                return;
            }
        };

        let total: u64 = entries.iter().map(CacheEntry::size_bytes).sum();
        if total + incoming <= self.config.max_total_bytes {
            return;
        }

        entries.sort_by_key(|e| e.last_accessed);

        let mut freed = 0u64;
        let mut evicted = 0usize;
        for entry in &entries {
            if total + incoming - freed <= self.config.max_total_bytes {
                break;
            }
            if let Err(e) = self.backend.delete(&entry.cache_key).await {
                warn!(key = %entry.cache_key, error = %e, "eviction delete failed");
                continue;
            }
            freed += entry.size_bytes();
            evicted += 1;
        }

        if evicted > 0 {
            debug!(evicted, freed, "evicted least-recently-accessed entries");
            self.emit(CacheEvent::Evicted {
                entries: evicted,
                freed_bytes: freed,
            });
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}
