//! Speech-Synthesis Engine Abstraction
//!
//! Wraps the platform speech engine (Web Speech API, AVSpeechSynthesizer,
//! android.speech.tts, speech-dispatcher). These engines share an awkward
//! shape: no reliable pause/resume or seek, progress reported only as
//! word/character boundaries, and platform-specific startup races. The trait
//! exposes the raw engine surface; compensation logic (resume cursors, retry,
//! watchdog) lives in the core speech controller, driven by the
//! [`SpeechCapabilities`] descriptor the host supplies at startup.

use std::time::Duration;

use crate::{error::Result, platform::PlatformSend, platform::PlatformSendSync};

/// A voice offered by the platform engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechVoice {
    /// Engine-assigned voice name, unique within the engine.
    pub name: String,
    /// BCP-47 language tag (e.g. "en-US").
    pub language: String,
    /// `true` when the voice is hosted locally rather than streamed.
    pub local: bool,
    /// `true` when the engine marks this voice as its default.
    pub default_voice: bool,
}

impl SpeechVoice {
    /// Whether this voice speaks a language under the given prefix
    /// (e.g. `"en"` matches `"en-US"` and `"en-GB"`).
    pub fn matches_language(&self, prefix: &str) -> bool {
        self.language.starts_with(prefix)
    }
}

/// A single utterance handed to the engine.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    /// Text to speak.
    pub text: String,
    /// BCP-47 language tag.
    pub language: String,
    /// Rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Volume in `0.0..=1.0`.
    pub volume: f32,
    /// Resolved voice name, or `None` for the engine default.
    pub voice: Option<String>,
}

impl UtteranceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }
}

/// Error classification reported by the engine for a failed utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// The utterance was cut off by a newer utterance or an explicit cancel.
    /// Expected during normal operation and filtered by the controller.
    Interrupted,
    /// The engine dropped the utterance. When this arrives before any
    /// boundary event it indicates the platform startup race.
    Canceled,
    /// Anything else the engine reports (synthesis failure, audio route loss).
    Other(String),
}

/// Events emitted by the engine for the active utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEngineEvent {
    /// A word/character boundary was reached. `char_index` is the offset into
    /// the utterance text, in characters.
    Boundary { char_index: usize },
    /// The utterance finished naturally.
    Ended,
    /// The utterance failed. `char_index` is the engine's best guess at where.
    Error {
        kind: SpeechErrorKind,
        char_index: usize,
    },
}

/// Instantaneous engine state, as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    /// An utterance is audibly in progress.
    pub speaking: bool,
    /// An utterance has been queued but not started.
    pub pending: bool,
    /// The engine reports a paused state.
    pub paused: bool,
}

impl EngineStatus {
    /// `true` when the engine shows no sign of the utterance it was just
    /// given. Used by the startup watchdog.
    pub fn is_silent(&self) -> bool {
        !self.speaking && !self.pending
    }
}

/// Quirk descriptor for the host's speech engine, injected at startup.
///
/// Keeps the controller free of user-agent sniffing: hosts that know their
/// engine is unreliable describe the workarounds here instead.
#[derive(Debug, Clone)]
pub struct SpeechCapabilities {
    /// Engine honors `pause()`/`resume()`. When `false` the controller always
    /// resumes by re-speaking from the recorded cursor.
    pub native_pause_resume: bool,
    /// Delay to insert between `cancel()` and the next `speak()`. Some
    /// engines spuriously cancel the new utterance without it.
    pub cancel_settling_delay: Duration,
    /// How long after `speak()` to wait before checking that the engine is
    /// speaking or pending.
    pub startup_watchdog_delay: Duration,
    /// When non-empty, locally-hosted voices outside this list are skipped
    /// during selection (engines that list voices which do not work).
    pub safe_voice_allowlist: Vec<String>,
}

impl Default for SpeechCapabilities {
    fn default() -> Self {
        Self {
            native_pause_resume: true,
            cancel_settling_delay: Duration::ZERO,
            startup_watchdog_delay: Duration::from_millis(200),
            safe_voice_allowlist: Vec::new(),
        }
    }
}

impl SpeechCapabilities {
    /// Conservative profile for engines with the cancel race and unreliable
    /// pause/resume (mobile browsers).
    pub fn restricted() -> Self {
        Self {
            native_pause_resume: false,
            cancel_settling_delay: Duration::from_millis(300),
            startup_watchdog_delay: Duration::from_millis(200),
            safe_voice_allowlist: Vec::new(),
        }
    }

    pub fn with_allowlist(mut self, names: Vec<String>) -> Self {
        self.safe_voice_allowlist = names;
        self
    }

    /// Whether a voice is acceptable under the allowlist. Network-hosted
    /// voices always pass; the list constrains local ones.
    pub fn allows(&self, voice: &SpeechVoice) -> bool {
        self.safe_voice_allowlist.is_empty()
            || !voice.local
            || self.safe_voice_allowlist.iter().any(|n| n == &voice.name)
    }
}

/// Platform speech-synthesis engine.
///
/// Implementations queue at most one utterance at a time as far as the core
/// is concerned; `speak` while another utterance is active is preceded by
/// `cancel` from the controller.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SpeechEngine: PlatformSendSync {
    /// Voices currently available. May change as the engine warms up.
    async fn voices(&self) -> Result<Vec<SpeechVoice>>;

    /// Queue an utterance for playback.
    async fn speak(&self, request: UtteranceRequest) -> Result<()>;

    /// Cancel the active and any queued utterance. Idempotent.
    async fn cancel(&self) -> Result<()>;

    /// Best-effort native pause. Only meaningful when the host declared
    /// `native_pause_resume`.
    async fn pause(&self) -> Result<()>;

    /// Best-effort native resume of a paused utterance.
    async fn resume(&self) -> Result<()>;

    /// Instantaneous engine state.
    async fn status(&self) -> Result<EngineStatus>;

    /// Subscribe to engine events. Events for every utterance issued through
    /// this engine flow through the returned stream in order.
    async fn subscribe(&self) -> Result<Box<dyn SpeechEventStream>>;
}

/// Stream of speech engine events.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SpeechEventStream: PlatformSend {
    /// Get the next engine event. Returns `None` when the engine is gone.
    async fn next(&mut self) -> Option<SpeechEngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str, local: bool) -> SpeechVoice {
        SpeechVoice {
            name: name.to_string(),
            language: language.to_string(),
            local,
            default_voice: false,
        }
    }

    #[test]
    fn language_prefix_matching() {
        let v = voice("Daniel", "en-GB", true);
        assert!(v.matches_language("en"));
        assert!(v.matches_language("en-GB"));
        assert!(!v.matches_language("ko"));
    }

    #[test]
    fn allowlist_constrains_local_voices_only() {
        let caps = SpeechCapabilities::restricted()
            .with_allowlist(vec!["Samantha".to_string(), "Karen".to_string()]);

        assert!(caps.allows(&voice("Samantha", "en-US", true)));
        assert!(!caps.allows(&voice("Eloquence", "en-US", true)));
        // Network voices always pass.
        assert!(caps.allows(&voice("Google US English", "en-US", false)));
    }

    #[test]
    fn empty_allowlist_allows_everything() {
        let caps = SpeechCapabilities::default();
        assert!(caps.allows(&voice("Anything", "en-US", true)));
    }

    #[test]
    fn engine_status_silence() {
        assert!(EngineStatus::default().is_silent());
        assert!(!EngineStatus {
            pending: true,
            ..Default::default()
        }
        .is_silent());
    }
}
