//! # Session Configuration Module
//!
//! Provides configuration management for the sentence player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `SessionConfig` instance that holds all bridge dependencies and player
//! preferences for one playback session. It enforces fail-fast validation so
//! a missing bridge is reported at construction, not at first playback.
//!
//! ## Required Dependencies
//!
//! - `SpeechEngine` - The local speech-synthesis fallback always exists
//! - `SettingsStore` - Preferences and saved playlists
//!
//! ## Optional Dependencies
//!
//! - `ClipEngine` + `SynthesisProvider` - The network-audio path. The two
//!   come as a pair; providing only one is a configuration error.
//! - `NetworkMonitor` - Connectivity signal for backend selection. Without
//!   one the session assumes it is online.
//! - `Clock` - Time source (defaults to the system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SessionConfig;
//! use std::sync::Arc;
//!
//! let config = SessionConfig::builder()
//!     .speech_engine(Arc::new(MySpeechEngine))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .clip_engine(Arc::new(MyClipEngine))
//!     .synthesis_provider(Arc::new(MyTtsClient))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::speech::SpeechCapabilities;
use bridge_traits::time::SystemClock;
use bridge_traits::{
    ClipEngine, Clock, NetworkMonitor, SettingsStore, SpeechEngine, SynthesisProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the user wants synthesis routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsMode {
    /// Prefer the network backend, fall through to speech when offline.
    #[default]
    Auto,
    /// Same routing as `Auto`; the user explicitly picked the cloud voice
    /// catalog, so hosts show cloud voices in their pickers.
    Network,
    /// Never touch the network; always use the local speech engine.
    SpeechOnly,
}

impl TtsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsMode::Auto => "auto",
            TtsMode::Network => "network",
            TtsMode::SpeechOnly => "speech_only",
        }
    }

    /// Parse a persisted mode string. Unknown values fall back to `Auto`.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "network" => TtsMode::Network,
            "speech_only" => TtsMode::SpeechOnly,
            _ => TtsMode::Auto,
        }
    }
}

/// What happens when a track finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Advance through the playlist once, stop at the end.
    #[default]
    None,
    /// Replay the current track.
    One,
    /// Advance and wrap back to the first track at the end.
    All,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }

    /// Parse a persisted mode string. Unknown values fall back to `None`.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "one" => RepeatMode::One,
            "all" => RepeatMode::All,
            _ => RepeatMode::None,
        }
    }
}

/// Settings-store keys for persisted preferences.
const KEY_TTS_MODE: &str = "tts_mode";
const KEY_PLAYBACK_SPEED: &str = "playback_speed";
const KEY_REPEAT_MODE: &str = "repeat_mode";
const KEY_PREFERRED_VOICE: &str = "preferred_voice";

/// Player preferences resolved at session construction.
///
/// Loaded from the `SettingsStore` when present, otherwise defaulted. The
/// orchestrator consumes these as its initial state; later changes are
/// persisted back through [`PlayerPreferences::persist`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPreferences {
    /// Synthesis routing preference.
    pub tts_mode: TtsMode,
    /// Rate multiplier in `[0.25, 4.0]`.
    pub speed: f32,
    /// Track-advance policy.
    pub repeat: RepeatMode,
    /// Preferred voice identifier, if the user picked one.
    pub preferred_voice: Option<String>,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            tts_mode: TtsMode::Auto,
            speed: 1.0,
            repeat: RepeatMode::None,
            preferred_voice: None,
        }
    }
}

impl PlayerPreferences {
    /// Load preferences from the settings store, defaulting anything absent
    /// or unparseable. Storage faults degrade to defaults.
    pub async fn load(store: &dyn SettingsStore) -> Self {
        let mut prefs = Self::default();

        if let Ok(Some(mode)) = store.get_string(KEY_TTS_MODE).await {
            prefs.tts_mode = TtsMode::from_str_lossy(&mode);
        }
        if let Ok(Some(speed)) = store.get_f64(KEY_PLAYBACK_SPEED).await {
            let speed = speed as f32;
            if (0.25..=4.0).contains(&speed) {
                prefs.speed = speed;
            }
        }
        if let Ok(Some(repeat)) = store.get_string(KEY_REPEAT_MODE).await {
            prefs.repeat = RepeatMode::from_str_lossy(&repeat);
        }
        if let Ok(Some(voice)) = store.get_string(KEY_PREFERRED_VOICE).await {
            if !voice.is_empty() {
                prefs.preferred_voice = Some(voice);
            }
        }

        prefs
    }

    /// Persist preferences back to the settings store.
    pub async fn persist(&self, store: &dyn SettingsStore) -> Result<()> {
        store
            .set_string(KEY_TTS_MODE, self.tts_mode.as_str())
            .await
            .map_err(|e| Error::Internal(format!("Failed to persist tts mode: {}", e)))?;
        store
            .set_f64(KEY_PLAYBACK_SPEED, self.speed as f64)
            .await
            .map_err(|e| Error::Internal(format!("Failed to persist speed: {}", e)))?;
        store
            .set_string(KEY_REPEAT_MODE, self.repeat.as_str())
            .await
            .map_err(|e| Error::Internal(format!("Failed to persist repeat mode: {}", e)))?;
        match &self.preferred_voice {
            Some(voice) => store
                .set_string(KEY_PREFERRED_VOICE, voice)
                .await
                .map_err(|e| Error::Internal(format!("Failed to persist voice: {}", e)))?,
            None => store
                .delete(KEY_PREFERRED_VOICE)
                .await
                .map_err(|e| Error::Internal(format!("Failed to clear voice: {}", e)))?,
        }
        Ok(())
    }
}

/// Session configuration for the sentence player core.
///
/// This struct holds all bridge dependencies and initial preferences required
/// to run one playback session. Use [`SessionConfigBuilder`] to construct
/// instances.
#[derive(Clone)]
pub struct SessionConfig {
    /// Local speech-synthesis engine (required; it is the fallback of last
    /// resort).
    pub speech_engine: Arc<dyn SpeechEngine>,

    /// Preferences and playlist storage (required).
    pub settings_store: Arc<dyn SettingsStore>,

    /// Media-element engine for synthesized clips (optional; paired with
    /// `synthesis_provider`).
    pub clip_engine: Option<Arc<dyn ClipEngine>>,

    /// Cloud synthesis collaborator (optional; paired with `clip_engine`).
    pub synthesis_provider: Option<Arc<dyn SynthesisProvider>>,

    /// Connectivity signal (optional; absent means assume online).
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Time source for cache bookkeeping.
    pub clock: Arc<dyn Clock>,

    /// Quirk descriptor for the host's speech engine.
    pub speech_capabilities: SpeechCapabilities,

    /// Initial player preferences.
    pub preferences: PlayerPreferences,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("speech_engine", &"SpeechEngine { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "clip_engine",
                &self.clip_engine.as_ref().map(|_| "ClipEngine { ... }"),
            )
            .field(
                "synthesis_provider",
                &self
                    .synthesis_provider
                    .as_ref()
                    .map(|_| "SynthesisProvider { ... }"),
            )
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("speech_capabilities", &self.speech_capabilities)
            .field("preferences", &self.preferences)
            .finish()
    }
}

impl SessionConfig {
    /// Creates a new builder for constructing a `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Whether this session can use the network-audio path at all.
    pub fn has_network_backend(&self) -> bool {
        self.clip_engine.is_some() && self.synthesis_provider.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.clip_engine.is_some() != self.synthesis_provider.is_some() {
            return Err(Error::Config(
                "The network-audio path needs both a ClipEngine and a SynthesisProvider. \
                 Provide both, or neither for a speech-only session."
                    .to_string(),
            ));
        }

        if !(0.25..=4.0).contains(&self.preferences.speed) {
            return Err(Error::Config(format!(
                "Playback speed {} is outside [0.25, 4.0]",
                self.preferences.speed
            )));
        }

        Ok(())
    }
}

/// Builder for constructing [`SessionConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then call
/// [`build()`](SessionConfigBuilder::build) to create the final config. The
/// builder validates required dependencies and provides actionable error
/// messages.
#[derive(Default)]
pub struct SessionConfigBuilder {
    speech_engine: Option<Arc<dyn SpeechEngine>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clip_engine: Option<Arc<dyn ClipEngine>>,
    synthesis_provider: Option<Arc<dyn SynthesisProvider>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    speech_capabilities: Option<SpeechCapabilities>,
    preferences: Option<PlayerPreferences>,
}

impl SessionConfigBuilder {
    /// Sets the speech engine implementation (required).
    pub fn speech_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.speech_engine = Some(engine);
        self
    }

    /// Sets the settings store implementation (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the clip engine used for network-synthesized audio.
    pub fn clip_engine(mut self, engine: Arc<dyn ClipEngine>) -> Self {
        self.clip_engine = Some(engine);
        self
    }

    /// Sets the cloud synthesis collaborator.
    pub fn synthesis_provider(mut self, provider: Arc<dyn SynthesisProvider>) -> Self {
        self.synthesis_provider = Some(provider);
        self
    }

    /// Sets the network monitor.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the time source. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the speech-engine quirk descriptor. Defaults to a well-behaved
    /// engine (native pause/resume, no settling delay).
    pub fn speech_capabilities(mut self, capabilities: SpeechCapabilities) -> Self {
        self.speech_capabilities = Some(capabilities);
        self
    }

    /// Sets the initial player preferences. Defaults to
    /// [`PlayerPreferences::default`]; most hosts load persisted values with
    /// [`PlayerPreferences::load`] first.
    pub fn preferences(mut self, preferences: PlayerPreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Builds the final `SessionConfig`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityMissing` when a required bridge was not
    /// provided, and `Error::Config` when the provided pieces are
    /// inconsistent.
    pub fn build(self) -> Result<SessionConfig> {
        let speech_engine = self.speech_engine.ok_or_else(|| Error::CapabilityMissing {
            capability: "SpeechEngine".to_string(),
            message: "A SpeechEngine implementation is required; it is the fallback \
                      backend when the network path is unavailable. \
                      Web: wrap speechSynthesis. Desktop: wrap the platform TTS service."
                .to_string(),
        })?;

        let settings_store = self.settings_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "A SettingsStore implementation is required for preferences and \
                      saved playlists. Use MemorySettingsStore for throwaway sessions."
                .to_string(),
        })?;

        let config = SessionConfig {
            speech_engine,
            settings_store,
            clip_engine: self.clip_engine,
            synthesis_provider: self.synthesis_provider,
            network_monitor: self.network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            speech_capabilities: self.speech_capabilities.unwrap_or_default(),
            preferences: self.preferences.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
