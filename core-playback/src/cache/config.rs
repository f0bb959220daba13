//! Cache tuning knobs

use std::time::Duration;

/// Configuration for the audio cache store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total size budget. Inserts evict least-recently-accessed entries
    /// until the new entry fits; a single entry larger than the whole
    /// budget is still admitted alone.
    pub max_total_bytes: u64,

    /// Age past which an entry is expired regardless of use.
    pub entry_ttl: Duration,

    /// How many characters of the source text to keep alongside an entry
    /// for inspection.
    pub preview_chars: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 100 * 1024 * 1024,
            entry_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            preview_chars: 100,
        }
    }
}
