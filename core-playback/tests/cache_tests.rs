//! Audio cache store properties: expiry, LRU budget, fault degradation.

mod support;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use bridge_traits::Clock;
use core_playback::cache::{AudioCacheStore, CacheConfig, MemoryCacheBackend};
use core_playback::fingerprint;
use support::FailingCacheBackend;

/// Manually advanced clock so expiry is deterministic.
struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        })
    }

    fn advance(&self, delta: ChronoDuration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn store_with(
    backend: Arc<MemoryCacheBackend>,
    clock: Arc<TestClock>,
    config: CacheConfig,
) -> AudioCacheStore {
    AudioCacheStore::new(backend, clock).with_config(config)
}

fn audio(len: usize) -> Bytes {
    Bytes::from(vec![0xA5u8; len])
}

#[tokio::test]
async fn put_then_get_round_trips() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let store = store_with(backend, clock, CacheConfig::default());

    let key = fingerprint("Hello there.", "en-US-Standard-F");
    store
        .put(&key, audio(1024), 2.7, "en-US-Standard-F", "Hello there.")
        .await;

    let entry = store.get(&key).await.expect("entry should be present");
    assert_eq!(entry.audio, audio(1024));
    assert_eq!(entry.voice_id, "en-US-Standard-F");
    assert_eq!(entry.duration_seconds, 2.7);
    assert_eq!(entry.text_preview, "Hello there.");
}

#[tokio::test]
async fn entries_expire_after_thirty_days_and_are_deleted() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let store = store_with(Arc::clone(&backend), Arc::clone(&clock), CacheConfig::default());

    store.put("key", audio(64), 1.0, "voice", "text").await;

    clock.advance(ChronoDuration::days(29));
    assert!(store.get("key").await.is_some());

    clock.advance(ChronoDuration::days(2));
    assert!(store.get("key").await.is_none());
    // The expired entry was removed, not just hidden.
    assert!(backend.is_empty());
}

#[tokio::test]
async fn startup_sweep_removes_only_expired_entries() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let store = store_with(Arc::clone(&backend), Arc::clone(&clock), CacheConfig::default());

    store.put("old", audio(64), 1.0, "voice", "old text").await;
    clock.advance(ChronoDuration::days(31));
    store.put("new", audio(64), 1.0, "voice", "new text").await;

    let swept = store.sweep_expired().await;
    assert_eq!(swept, 1);
    assert!(store.get("new").await.is_some());
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn lru_eviction_removes_oldest_accessed_first() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let config = CacheConfig {
        max_total_bytes: 100,
        ..CacheConfig::default()
    };
    let store = store_with(Arc::clone(&backend), Arc::clone(&clock), config);

    store.put("a", audio(40), 1.0, "voice", "a").await;
    clock.advance(ChronoDuration::seconds(10));
    store.put("b", audio(40), 1.0, "voice", "b").await;
    clock.advance(ChronoDuration::seconds(10));

    // Touch "a" so "b" becomes the least recently accessed.
    store.get("a").await.expect("a present");
    clock.advance(ChronoDuration::seconds(10));

    store.put("c", audio(40), 1.0, "voice", "c").await;

    assert!(store.get("a").await.is_some());
    assert!(store.get("b").await.is_none(), "b was evicted");
    assert!(store.get("c").await.is_some());
    assert!(store.total_size().await <= 100);
}

#[tokio::test]
async fn an_entry_larger_than_the_budget_is_still_admitted() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let config = CacheConfig {
        max_total_bytes: 100,
        ..CacheConfig::default()
    };
    let store = store_with(Arc::clone(&backend), Arc::clone(&clock), config);

    store.put("small", audio(60), 1.0, "voice", "small").await;
    clock.advance(ChronoDuration::seconds(1));
    store.put("huge", audio(400), 1.0, "voice", "huge").await;

    // Everything else went, but the oversized entry is in.
    assert!(store.get("small").await.is_none());
    assert!(store.get("huge").await.is_some());
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn duration_correction_updates_in_place() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let store = store_with(backend, clock, CacheConfig::default());

    store.put("key", audio(64), 3.0, "voice", "text").await;
    store.update_duration("key", 2.31).await;

    let entry = store.get("key").await.unwrap();
    assert_eq!(entry.duration_seconds, 2.31);
    assert_eq!(entry.audio, audio(64));

    // Absent keys are a no-op, not an error.
    store.update_duration("missing", 9.9).await;
}

#[tokio::test]
async fn hits_refresh_last_accessed() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let clock = TestClock::new();
    let store = store_with(Arc::clone(&backend), Arc::clone(&clock), CacheConfig::default());

    store.put("key", audio(64), 1.0, "voice", "text").await;
    let created = store.get("key").await.unwrap().last_accessed;

    clock.advance(ChronoDuration::minutes(5));
    let touched = store.get("key").await.unwrap().last_accessed;
    assert_eq!(touched - created, ChronoDuration::minutes(5));
}

#[tokio::test]
async fn backend_faults_degrade_to_misses() {
    let clock = TestClock::new();
    let store = AudioCacheStore::new(Arc::new(FailingCacheBackend), clock);

    // Reads miss, writes vanish, sweeps count nothing; nothing panics or
    // propagates.
    assert!(store.get("key").await.is_none());
    store.put("key", audio(64), 1.0, "voice", "text").await;
    store.update_duration("key", 2.0).await;
    assert_eq!(store.sweep_expired().await, 0);
    assert_eq!(store.total_size().await, 0);
}

#[tokio::test]
async fn fingerprint_is_stable_and_speed_free() {
    // Pinned value: the fingerprint must not drift across releases, or
    // every cached clip is orphaned.
    assert_eq!(fingerprint("a", "b"), "229w");

    let key = fingerprint("The same sentence.", "en-US-Standard-F");
    assert_eq!(key, fingerprint("The same sentence.", "en-US-Standard-F"));
    assert_ne!(key, fingerprint("The same sentence.", "en-GB-Standard-A"));
}
