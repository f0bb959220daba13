//! Audio Clip Playback Abstraction
//!
//! Wraps the platform media element used to play synthesized audio clips
//! (HTML5 `Audio`, AVAudioPlayer, a rodio sink). Unlike the speech engine,
//! clips offer exact pause/resume and live rate changes, which is why the
//! core prefers this path whenever a clip can be fetched.

use std::time::Duration;

use bytes::Bytes;

use crate::{error::Result, platform::PlatformSend, platform::PlatformSendSync};

/// Events emitted by a clip handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipEvent {
    /// Media metadata became available. `duration` is measured at 1.0x rate
    /// regardless of the current rate multiplier.
    MetadataLoaded { duration: Duration },
    /// Playback position advanced.
    Progress {
        position: Duration,
        duration: Duration,
    },
    /// The clip finished playing.
    Ended,
    /// The clip failed mid-flight (decode error, source detached).
    Error { message: String },
}

/// Factory that turns fetched audio bytes into a playable handle.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ClipEngine: PlatformSendSync {
    /// Open an encoded audio buffer (e.g. MP3) as a playable clip. The handle
    /// owns any platform resource (object URL, decoder, sink) until
    /// [`ClipHandle::release`] is called.
    async fn open(&self, data: Bytes) -> Result<Box<dyn ClipHandle>>;
}

/// A live audio clip.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ClipHandle: PlatformSend {
    /// Begin or resume playback from the current position.
    async fn play(&mut self) -> Result<()>;

    /// Pause, preserving the exact position.
    async fn pause(&mut self) -> Result<()>;

    /// Change the rate multiplier on the live clip without restarting.
    /// Does not affect the duration reported by [`ClipEvent::MetadataLoaded`].
    async fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;

    /// Release the underlying media resource and any temporary URI handle.
    /// Idempotent; events stop after release.
    async fn release(&mut self) -> Result<()>;

    /// Subscribe to this clip's events. Called once per handle.
    async fn subscribe(&mut self) -> Result<Box<dyn ClipEventStream>>;
}

/// Stream of clip events.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ClipEventStream: PlatformSend {
    /// Get the next clip event. Returns `None` once the clip is released.
    async fn next(&mut self) -> Option<ClipEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_event_carries_unscaled_duration() {
        let event = ClipEvent::MetadataLoaded {
            duration: Duration::from_millis(2350),
        };
        match event {
            ClipEvent::MetadataLoaded { duration } => {
                assert_eq!(duration, Duration::from_millis(2350))
            }
            _ => unreachable!(),
        }
    }
}
