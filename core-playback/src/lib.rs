//! # Playback Core
//!
//! The dual-backend playback engine: one uniform play/pause/speed/repeat
//! surface over two very different audio paths.
//!
//! - **Network backend** ([`clip`]): synthesized clips fetched from the
//!   cloud collaborator and cached locally. Exact pause/resume, live rate
//!   changes, measured durations.
//! - **Speech backend** ([`speech`]): the platform speech engine. No
//!   reliable pause, resume, or rate change; the controller compensates
//!   with a resume cursor, restart-based seeks, and a startup retry policy.
//!
//! The [`orchestrator`] owns all playback state, arbitrates between the
//! backends via the [`selector`], falls back from network to speech on
//! failure, and guards every controller callback against staleness with
//! session identities ([`signals`]). Synthesized audio persists in the
//! [`cache`] under a speed-independent fingerprint.

pub mod cache;
pub mod clip;
pub mod error;
pub mod orchestrator;
pub mod selector;
pub mod signals;
pub mod speech;
pub mod state;

pub use cache::{fingerprint, AudioCacheBackend, AudioCacheStore, CacheConfig, MemoryCacheBackend};
pub use clip::ClipController;
pub use error::{PlaybackError, Result};
pub use orchestrator::{PlaybackOrchestrator, DEFAULT_VOICE_ID};
pub use selector::{select_backend, Backend};
pub use signals::{ControllerEvent, ControllerSignal, PlaybackSessionId};
pub use speech::SpeechController;
pub use state::{ActiveBackend, PlaybackState, Transport};
