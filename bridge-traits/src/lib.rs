//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, mobile, web).
//!
//! ## Traits
//!
//! ### Audio Engines
//! - [`ClipEngine`](media::ClipEngine) - Opens fetched audio clips into playable handles
//! - [`ClipHandle`](media::ClipHandle) - A live clip with exact pause/resume and rate control
//! - [`SpeechEngine`](speech::SpeechEngine) - The platform speech-synthesis engine
//!
//! ### Collaborators
//! - [`SynthesisProvider`](synthesis::SynthesisProvider) - Cloud text-to-speech synthesis and voice listing
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations for provider implementations
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity signal for backend selection
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences and playlist persistence
//! - [`Clock`](time::Clock) - Time source for deterministic cache-expiry testing
//!
//! ## Quirk Isolation
//!
//! Platform-specific speech-engine quirks (missing native pause/resume, the
//! cancel-then-speak race, voices that appear in listings but do not work) are
//! not detected at runtime by the core. Hosts describe them up front through
//! [`SpeechCapabilities`](speech::SpeechCapabilities) so the controller logic
//! stays branch-free and the quirk data is testable on its own.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages.
//!
//! ## Thread Safety
//!
//! Trait bounds use the [`platform`] marker traits: `Send + Sync` on native
//! targets, relaxed on `wasm32` where host objects are single-threaded.

pub mod error;
pub mod http;
pub mod media;
pub mod network;
pub mod platform;
pub mod speech;
pub mod storage;
pub mod synthesis;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{ClipEngine, ClipEvent, ClipEventStream, ClipHandle};
pub use network::{NetworkMonitor, NetworkStatus, StaticNetworkMonitor};
pub use speech::{
    EngineStatus, SpeechCapabilities, SpeechEngine, SpeechEngineEvent, SpeechErrorKind,
    SpeechEventStream, SpeechVoice, UtteranceRequest,
};
pub use storage::{MemorySettingsStore, SettingsStore};
pub use synthesis::{
    SynthesisErrorKind, SynthesisFailure, SynthesisProvider, SynthesisRequest, SynthesizedAudio,
    VoiceDescriptor,
};
pub use time::{Clock, SystemClock};
