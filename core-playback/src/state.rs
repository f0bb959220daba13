//! Playback state model
//!
//! The orchestrator is the single writer of [`PlaybackState`]; controllers
//! only emit signals. The transport is an enum rather than two booleans so
//! "playing and paused at once" is unrepresentable.

use serde::{Deserialize, Serialize};

use bridge_traits::synthesis::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use core_runtime::config::RepeatMode;

/// Transport position of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Which backend currently holds a live audio resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveBackend {
    /// Cached or fetched audio clip.
    Network,
    /// Platform speech-synthesis engine.
    Speech,
    /// Neither controller holds a resource.
    #[default]
    None,
}

impl ActiveBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveBackend::Network => "network",
            ActiveBackend::Speech => "speech",
            ActiveBackend::None => "none",
        }
    }
}

/// Snapshot of the orchestrator's mutable playback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Index of the current track in the active playlist.
    pub track_index: usize,
    /// Transport position.
    pub transport: Transport,
    /// Rate multiplier in `[0.25, 4.0]`.
    pub speed: f32,
    /// Track-advance policy.
    pub repeat: RepeatMode,
    /// Backend holding the live resource. `None` exactly when stopped.
    pub active_backend: ActiveBackend,
}

impl PlaybackState {
    pub fn new(speed: f32, repeat: RepeatMode) -> Self {
        Self {
            track_index: 0,
            transport: Transport::Stopped,
            speed: clamp_speed(speed),
            repeat,
            active_backend: ActiveBackend::None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.transport == Transport::Paused
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0, RepeatMode::None)
    }
}

/// Clamp a requested rate multiplier into the supported range.
pub fn clamp_speed(speed: f32) -> f32 {
    speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_flags_are_mutually_exclusive() {
        let mut state = PlaybackState::default();
        assert!(!state.is_playing() && !state.is_paused());

        state.transport = Transport::Playing;
        assert!(state.is_playing() && !state.is_paused());

        state.transport = Transport::Paused;
        assert!(!state.is_playing() && state.is_paused());
    }

    #[test]
    fn speed_is_clamped_at_construction() {
        assert_eq!(PlaybackState::new(9.0, RepeatMode::None).speed, 4.0);
        assert_eq!(PlaybackState::new(0.1, RepeatMode::None).speed, 0.25);
        assert_eq!(PlaybackState::new(1.5, RepeatMode::None).speed, 1.5);
    }
}
