//! # Playback Error Types
//!
//! Error taxonomy for the dual-backend playback core. Every failure a
//! controller can produce is classified here before it reaches the
//! orchestrator; the orchestrator never sees a raw engine or transport
//! error. Cancellation artifacts (an utterance interrupted by our own stop
//! or restart) are filtered at the controller boundary and never enter this
//! taxonomy.

use bridge_traits::error::BridgeError;
use bridge_traits::synthesis::{SynthesisErrorKind, SynthesisFailure};
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone)]
pub enum PlaybackError {
    /// Bad input rejected before any collaborator request (empty or
    /// oversized text, speed out of range).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The network synthesis path failed. Classified by the collaborator's
    /// status: `Auth` (401/403), `Quota` (429), `Network` (transport),
    /// `Other` (everything else, including clip decode failures).
    #[error("Synthesis failed ({kind:?}): {message}")]
    Synthesis {
        kind: SynthesisErrorKind,
        message: String,
    },

    /// The speech engine repeatedly failed to start an utterance; the retry
    /// cap was exhausted.
    #[error("Speech engine failed to start after {attempts} attempts")]
    SpeechStartup { attempts: u32 },

    /// The speech engine failed mid-utterance. Not retried.
    #[error("Speech engine error: {0}")]
    SpeechRuntime(String),

    /// A platform bridge call failed outside the classified paths above.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Audio cache fault surfaced where it could not degrade to a miss.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Attempted playback with an empty playlist.
    #[error("Playlist is empty")]
    EmptyPlaylist,
}

impl PlaybackError {
    /// Returns `true` when the orchestrator should fall back to the speech
    /// backend instead of halting. Only network-path failures qualify.
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, PlaybackError::Synthesis { .. })
    }

    /// Returns `true` when playback cannot continue without user action.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackError::SpeechStartup { .. } | PlaybackError::SpeechRuntime(_)
        )
    }
}

impl From<SynthesisFailure> for PlaybackError {
    fn from(failure: SynthesisFailure) -> Self {
        PlaybackError::Synthesis {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(error: BridgeError) -> Self {
        PlaybackError::Engine(error.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
