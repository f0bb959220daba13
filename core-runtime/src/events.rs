//! # Event Bus System
//!
//! Provides an event-driven architecture for the sentence player core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Orchestrator ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │ Cache Store  ├──────────────>│  channel) ├─────────────────>│ Host UI    │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │ Library      ├──────────────>│           ├─────────────────>│ Telemetry  │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! User-visible notices (backend fallback warnings, terminal playback errors)
//! travel this bus as events; hosts render them however they like (toasts,
//! status bars). The core never touches a UI.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, PlaylistEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! let event = CoreEvent::Playlist(PlaylistEvent::Loaded { track_count: 16 });
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types
//! of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n`
//!   events. This is non-fatal; the subscriber can continue receiving.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates
//!   shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events. Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback transport and progress events
    Playback(PlaybackEvent),
    /// Audio cache events
    Cache(CacheEvent),
    /// Playlist lifecycle events
    Playlist(PlaylistEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Playlist(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::BackendFellBack { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Playlist(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback of a track started.
    Started {
        /// Index of the track in the active playlist.
        track_index: usize,
        /// Which backend is producing audio ("network" or "speech").
        backend: String,
    },
    /// Playback paused.
    Paused {
        /// Index of the track in the active playlist.
        track_index: usize,
    },
    /// Playback resumed after pause.
    Resumed {
        /// Index of the track in the active playlist.
        track_index: usize,
    },
    /// Playback stopped and both backends released.
    Stopped,
    /// Track finished playing naturally.
    TrackCompleted {
        /// Index of the track that completed.
        track_index: usize,
    },
    /// Playback position changed (natural progression).
    PositionChanged {
        /// Index of the track in the active playlist.
        track_index: usize,
        /// Elapsed playback time (milliseconds).
        position_ms: u64,
        /// Total track duration (milliseconds). Estimated on the speech
        /// backend, measured on the network backend.
        duration_ms: u64,
    },
    /// The measured duration of a track became known.
    DurationMeasured {
        /// Index of the track in the active playlist.
        track_index: usize,
        /// Measured duration at 1.0x speed (milliseconds).
        duration_ms: u64,
    },
    /// Playback speed changed.
    SpeedChanged {
        /// New rate multiplier.
        speed: f32,
    },
    /// The network backend failed and playback continued on the speech
    /// backend. Hosts should surface this as a dismissible notice.
    BackendFellBack {
        /// Index of the track in the active playlist.
        track_index: usize,
        /// Why the network backend was abandoned.
        reason: String,
    },
    /// Playback error occurred.
    Error {
        /// Index of the track if one was active.
        track_index: Option<usize>,
        /// Human-readable error message.
        message: String,
        /// Whether playback halted; `false` means a fallback kept it going.
        terminal: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::TrackCompleted { .. } => "Track completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::DurationMeasured { .. } => "Track duration measured",
            PlaybackEvent::SpeedChanged { .. } => "Playback speed changed",
            PlaybackEvent::BackendFellBack { .. } => "Fell back to speech backend",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events related to the synthesized-audio cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A synthesis request was served from the cache.
    Hit {
        /// Fingerprint of the (text, voice) pair.
        cache_key: String,
        /// Size of the cached audio in bytes.
        size_bytes: u64,
    },
    /// No valid entry existed; synthesis went to the network.
    Miss {
        /// Fingerprint of the (text, voice) pair.
        cache_key: String,
    },
    /// A freshly synthesized clip was stored.
    Stored {
        /// Fingerprint of the (text, voice) pair.
        cache_key: String,
        /// Size of the stored audio in bytes.
        size_bytes: u64,
    },
    /// Least-recently-accessed entries were evicted to stay under budget.
    Evicted {
        /// Number of entries removed.
        entries: usize,
        /// Total bytes reclaimed.
        freed_bytes: u64,
    },
    /// Expired entries were removed during the startup sweep.
    ExpiredSwept {
        /// Number of entries removed.
        entries: usize,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hit { .. } => "Audio cache hit",
            CacheEvent::Miss { .. } => "Audio cache miss",
            CacheEvent::Stored { .. } => "Audio stored in cache",
            CacheEvent::Evicted { .. } => "Cache entries evicted",
            CacheEvent::ExpiredSwept { .. } => "Expired cache entries removed",
        }
    }
}

// ============================================================================
// Playlist Events
// ============================================================================

/// Events related to playlist lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    /// A playlist became the active one.
    Loaded {
        /// Number of tracks in the playlist.
        track_count: usize,
    },
    /// Tracks were parsed from pasted or uploaded text.
    Imported {
        /// Rows successfully converted to tracks.
        accepted: usize,
        /// Malformed rows that were dropped.
        dropped: usize,
    },
    /// The active playlist was saved under a name.
    Saved {
        /// Name the playlist was saved under.
        name: String,
        /// Number of tracks saved.
        track_count: usize,
    },
    /// A saved playlist was deleted.
    Deleted {
        /// Name of the deleted playlist.
        name: String,
    },
}

impl PlaylistEvent {
    fn description(&self) -> &str {
        match self {
            PlaylistEvent::Loaded { .. } => "Playlist loaded",
            PlaylistEvent::Imported { .. } => "Tracks imported",
            PlaylistEvent::Saved { .. } => "Playlist saved",
            PlaylistEvent::Deleted { .. } => "Playlist deleted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, CoreEvent, PlaybackEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// let mut subscriber = event_bus.subscribe();
///
/// let event = CoreEvent::Playback(PlaybackEvent::Started {
///     track_index: 0,
///     backend: "network".to_string(),
/// });
/// event_bus.emit(event).ok();
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// This provides a more ergonomic API for consuming events with optional
/// filtering by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for cache events only
/// let mut cache_stream = stream.filter(|event| {
///     matches!(event, CoreEvent::Cache(_))
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next
    /// matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            // Apply filter
            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
