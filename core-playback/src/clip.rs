//! Network-audio playback controller
//!
//! Plays synthesized clips through the host's media engine. This is the
//! preferred backend: it pauses and resumes at exact positions and applies
//! rate changes to a live clip without restarting. Loading goes fingerprint
//! -> cache -> synthesis collaborator, storing fresh audio back into the
//! cache on the way through.
//!
//! The controller never self-heals. Failures are classified into the
//! synthesis taxonomy and reported upward; deciding to fall back to the
//! speech backend is the orchestrator's job.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use bridge_traits::media::{ClipEngine, ClipEvent, ClipHandle};
use bridge_traits::synthesis::{SynthesisErrorKind, SynthesisProvider, SynthesisRequest};

use crate::cache::{fingerprint, AudioCacheStore};
use crate::error::{PlaybackError, Result};
use crate::signals::{ControllerEvent, ControllerSignal, PlaybackSessionId, SignalSender};

/// Audio ready to be opened as a clip, plus the cache key it lives under.
#[derive(Debug, Clone)]
pub struct PreparedClip {
    pub audio: Bytes,
    pub cache_key: String,
}

struct ActiveClip {
    handle: Box<dyn ClipHandle>,
    session: PlaybackSessionId,
}

/// Controller for the network-synthesized audio backend.
pub struct ClipController {
    engine: Arc<dyn ClipEngine>,
    synthesis: Arc<dyn SynthesisProvider>,
    cache: Arc<AudioCacheStore>,
    signals: SignalSender,
    active: Mutex<Option<ActiveClip>>,
}

impl ClipController {
    pub fn new(
        engine: Arc<dyn ClipEngine>,
        synthesis: Arc<dyn SynthesisProvider>,
        cache: Arc<AudioCacheStore>,
        signals: SignalSender,
    ) -> Self {
        Self {
            engine,
            synthesis,
            cache,
            signals,
            active: Mutex::new(None),
        }
    }

    /// Resolve audio for a sentence: cache hit, or synthesis plus a cache
    /// store. Slow (network); callers run it outside any state lock and
    /// re-check session currency afterwards.
    #[instrument(skip(self, text), fields(text_chars = text.chars().count()))]
    pub async fn prepare(
        &self,
        text: &str,
        voice_id: &str,
        model_id: Option<String>,
        speed: f32,
    ) -> Result<PreparedClip> {
        let request = SynthesisRequest::new(text, voice_id)
            .with_speed(speed)
            .with_model(model_id);
        request.validate().map_err(PlaybackError::Validation)?;

        let cache_key = fingerprint(text, voice_id);

        if let Some(entry) = self.cache.get(&cache_key).await {
            debug!(%cache_key, "serving clip from cache");
            return Ok(PreparedClip {
                audio: entry.audio,
                cache_key,
            });
        }

        debug!(%cache_key, "cache miss; synthesizing");
        let synthesized = self
            .synthesis
            .synthesize(request)
            .await
            .map_err(PlaybackError::from)?;

        self.cache
            .put(
                &cache_key,
                synthesized.audio.clone(),
                synthesized.estimated_duration.as_secs_f64(),
                voice_id,
                text,
            )
            .await;

        Ok(PreparedClip {
            audio: synthesized.audio,
            cache_key,
        })
    }

    /// Open a prepared clip and begin playback at the given rate. Any clip
    /// this controller already held is released first.
    pub async fn start(
        &self,
        prepared: PreparedClip,
        speed: f32,
        session: PlaybackSessionId,
    ) -> Result<()> {
        self.stop().await;

        let mut handle = self.engine.open(prepared.audio).await?;
        let stream = handle.subscribe().await?;
        handle.set_rate(speed).await?;

        let signals = self.signals.clone();
        let cache = Arc::clone(&self.cache);
        let cache_key = prepared.cache_key;
        tokio::spawn(pump_clip_events(stream, signals, cache, cache_key, session));

        handle.play().await?;

        let mut active = self.active.lock().await;
        *active = Some(ActiveClip { handle, session });
        Ok(())
    }

    /// Pause at the exact current position.
    pub async fn pause(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(clip) = active.as_mut() {
            clip.handle.pause().await?;
        }
        Ok(())
    }

    /// Resume from the exact paused position.
    pub async fn resume(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(clip) = active.as_mut() {
            clip.handle.play().await?;
        }
        Ok(())
    }

    /// Apply a new rate to the live clip. No reload, no restart, and the
    /// measured duration reported earlier stays valid.
    pub async fn set_speed(&self, speed: f32) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(clip) = active.as_mut() {
            clip.handle.set_rate(speed).await?;
        }
        Ok(())
    }

    /// Release the clip and its platform resources. Idempotent; safe to
    /// call with nothing loaded.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        if let Some(mut clip) = active.take() {
            if let Err(e) = clip.handle.release().await {
                warn!(session = %clip.session, error = %e, "clip release failed");
            }
        }
    }

    /// Session of the clip currently held, if any.
    pub async fn active_session(&self) -> Option<PlaybackSessionId> {
        self.active.lock().await.as_ref().map(|clip| clip.session)
    }
}

/// Forward clip engine events as controller signals. The first metadata
/// event also corrects the cached duration: the provider's estimate is a
/// placeholder and the measured value wins.
async fn pump_clip_events(
    mut stream: Box<dyn bridge_traits::media::ClipEventStream>,
    signals: SignalSender,
    cache: Arc<AudioCacheStore>,
    cache_key: String,
    session: PlaybackSessionId,
) {
    while let Some(event) = stream.next().await {
        let event = match event {
            ClipEvent::MetadataLoaded { duration } => {
                cache
                    .update_duration(&cache_key, duration.as_secs_f64())
                    .await;
                ControllerEvent::DurationKnown { duration }
            }
            ClipEvent::Progress { position, duration } => ControllerEvent::Progress {
                position,
                duration,
                fraction: progress_fraction(position, duration),
            },
            ClipEvent::Ended => ControllerEvent::Ended,
            ClipEvent::Error { message } => {
                // A clip that dies mid-flight is classified with the
                // synthesis taxonomy so the orchestrator's fallback rule
                // applies to it uniformly.
                ControllerEvent::Failed(PlaybackError::Synthesis {
                    kind: SynthesisErrorKind::Other,
                    message,
                })
            }
        };

        if signals.send(ControllerSignal::new(session, event)).is_err() {
            break;
        }
    }
}

fn progress_fraction(position: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped_and_zero_safe() {
        assert_eq!(progress_fraction(Duration::ZERO, Duration::ZERO), 0.0);
        assert_eq!(
            progress_fraction(Duration::from_secs(1), Duration::from_secs(4)),
            0.25
        );
        assert_eq!(
            progress_fraction(Duration::from_secs(5), Duration::from_secs(4)),
            1.0
        );
    }
}
