//! Playback orchestrator
//!
//! The single owner of playback state. Transport commands come in from the
//! host; progress, completion, and failure signals come in from the two
//! controllers over one channel; every mutation happens under one lock, in
//! one place.
//!
//! Two rules keep the dual-backend arrangement coherent:
//!
//! - **Session identity.** Every start, restart, or stop mints a fresh
//!   [`PlaybackSessionId`]. Controllers stamp their signals with the session
//!   they were started under, and the signal loop drops anything stale, so a
//!   slow synthesis call finishing after a rapid next-track command cannot
//!   touch state that no longer belongs to it.
//! - **Unconditional fallback.** Any failure on the network path falls back
//!   to the speech engine for the same track, with a user-visible notice.
//!   A terminal speech failure stops the transport; there is nothing left
//!   to fall back to.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use bridge_traits::NetworkMonitor;
use core_library::models::Track;
use core_runtime::config::{PlayerPreferences, RepeatMode, SessionConfig, TtsMode};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, PlaylistEvent};

use crate::cache::{AudioCacheBackend, AudioCacheStore};
use crate::clip::ClipController;
use crate::error::{PlaybackError, Result};
use crate::selector::{select_backend, Backend};
use crate::signals::{
    signal_channel, ControllerEvent, ControllerSignal, PlaybackSessionId, SignalSender,
};
use crate::speech::SpeechController;
use crate::state::{clamp_speed, ActiveBackend, PlaybackState, Transport};

/// Voice used for network synthesis when the user has not picked one.
pub const DEFAULT_VOICE_ID: &str = "en-US-Standard-F";

/// Pause between repeat-one replays of the same track.
const REPLAY_DELAY: Duration = Duration::from_millis(500);

struct Inner {
    tracks: Vec<Track>,
    state: PlaybackState,
    session: PlaybackSessionId,
    tts_mode: TtsMode,
    preferred_voice: Option<String>,
    voice_model: Option<String>,
}

/// Dual-backend playback state machine.
pub struct PlaybackOrchestrator {
    inner: Mutex<Inner>,
    clip: Option<Arc<ClipController>>,
    speech: SpeechController,
    cache: Arc<AudioCacheStore>,
    network: Option<Arc<dyn NetworkMonitor>>,
    bus: EventBus,
    signals: SignalSender,
}

impl PlaybackOrchestrator {
    /// Wire the orchestrator from a session configuration. Spawns the
    /// signal loop; the returned handle is the only way to drive playback.
    pub fn new(
        config: SessionConfig,
        cache_backend: Arc<dyn AudioCacheBackend>,
        bus: EventBus,
    ) -> Arc<Self> {
        let (signals, mut receiver) = signal_channel();

        let cache = Arc::new(
            AudioCacheStore::new(cache_backend, Arc::clone(&config.clock))
                .with_events(bus.clone()),
        );

        let clip = match (&config.clip_engine, &config.synthesis_provider) {
            (Some(engine), Some(synthesis)) => Some(Arc::new(ClipController::new(
                Arc::clone(engine),
                Arc::clone(synthesis),
                Arc::clone(&cache),
                signals.clone(),
            ))),
            _ => None,
        };

        let speech = SpeechController::new(
            Arc::clone(&config.speech_engine),
            config.speech_capabilities.clone(),
            signals.clone(),
        );

        let prefs = &config.preferences;
        let orchestrator = Arc::new(Self {
            inner: Mutex::new(Inner {
                tracks: Vec::new(),
                state: PlaybackState::new(prefs.speed, prefs.repeat),
                session: PlaybackSessionId::new(),
                tts_mode: prefs.tts_mode,
                preferred_voice: prefs.preferred_voice.clone(),
                voice_model: None,
            }),
            clip,
            speech,
            cache,
            network: config.network_monitor.clone(),
            bus,
            signals,
        });

        let weak = Arc::downgrade(&orchestrator);
        tokio::spawn(async move {
            while let Some(signal) = receiver.recv().await {
                let Some(this) = weak.upgrade() else { break };
                this.handle_signal(signal).await;
            }
        });

        orchestrator
    }

    /// One-time startup work: sweep expired cache entries.
    pub async fn initialize(&self) {
        self.cache.initialize().await;
    }

    /// Replace the active playlist. Stops playback, resets the track index
    /// and all progress.
    #[instrument(skip(self, tracks), fields(track_count = tracks.len()))]
    pub async fn load_playlist(&self, tracks: Vec<Track>) {
        let mut inner = self.inner.lock().await;
        self.halt_backends_locked(&mut inner).await;
        inner.state.transport = Transport::Stopped;
        inner.state.active_backend = ActiveBackend::None;
        inner.state.track_index = 0;
        inner.tracks = tracks;
        self.emit(CoreEvent::Playlist(PlaylistEvent::Loaded {
            track_count: inner.tracks.len(),
        }));
    }

    /// Play/pause toggle, the primary transport control.
    pub async fn toggle_play(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state.transport {
            Transport::Playing => self.pause_locked(&mut inner).await,
            Transport::Paused => self.resume_locked(&mut inner).await,
            Transport::Stopped => self.start_current_locked(&mut inner).await,
        }
    }

    /// Stop playback and release resources on both backends. Idempotent:
    /// stopping an already stopped player changes nothing.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        self.stop_locked(&mut inner).await;
    }

    /// Advance to the next track, wrapping to the first past the end.
    pub async fn next(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.tracks.is_empty() {
            return Ok(());
        }
        let next = if inner.state.track_index + 1 < inner.tracks.len() {
            inner.state.track_index + 1
        } else {
            0
        };
        self.jump_to_locked(&mut inner, next).await
    }

    /// Go to the previous track. Before the first track this wraps to the
    /// last only when repeat-all is on; otherwise it stays put.
    pub async fn prev(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.tracks.is_empty() {
            return Ok(());
        }
        let target = if inner.state.track_index > 0 {
            inner.state.track_index - 1
        } else if inner.state.repeat == RepeatMode::All {
            inner.tracks.len() - 1
        } else {
            return Ok(());
        };
        self.jump_to_locked(&mut inner, target).await
    }

    /// Jump to the first track.
    pub async fn first(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.tracks.is_empty() {
            return Ok(());
        }
        self.jump_to_locked(&mut inner, 0).await
    }

    /// Jump to the last track.
    pub async fn last(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.tracks.is_empty() {
            return Ok(());
        }
        let last = inner.tracks.len() - 1;
        self.jump_to_locked(&mut inner, last).await
    }

    /// Jump to an arbitrary track index (playlist click).
    pub async fn select_track(self: &Arc<Self>, index: usize) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if index >= inner.tracks.len() {
            return Ok(());
        }
        self.jump_to_locked(&mut inner, index).await
    }

    /// Change playback speed, clamped to `[0.25, 4.0]`. On a live clip the
    /// rate changes in place; on a live utterance the speech controller
    /// restarts from the resume cursor at the new rate.
    pub async fn set_speed(&self, speed: f32) -> Result<()> {
        let speed = clamp_speed(speed);
        let mut inner = self.inner.lock().await;
        inner.state.speed = speed;
        self.emit(CoreEvent::Playback(PlaybackEvent::SpeedChanged { speed }));

        match inner.state.active_backend {
            ActiveBackend::Network => {
                if let Some(clip) = &self.clip {
                    clip.set_speed(speed).await?;
                }
            }
            ActiveBackend::Speech => self.speech.set_speed(speed).await?,
            ActiveBackend::None => {}
        }
        Ok(())
    }

    /// Change the repeat mode. Takes effect at the next track completion.
    pub async fn set_repeat(&self, repeat: RepeatMode) {
        self.inner.lock().await.state.repeat = repeat;
    }

    /// Change the synthesis routing preference. Applies from the next
    /// playback start.
    pub async fn set_tts_mode(&self, mode: TtsMode) {
        self.inner.lock().await.tts_mode = mode;
    }

    /// Change the preferred voice. A playing track restarts so the change
    /// is audible immediately.
    pub async fn set_preferred_voice(
        self: &Arc<Self>,
        voice_id: Option<String>,
        model_id: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.preferred_voice = voice_id;
        inner.voice_model = model_id;
        if inner.state.is_playing() {
            return self.start_current_locked(&mut inner).await;
        }
        Ok(())
    }

    /// Snapshot of the playback state.
    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.state.clone()
    }

    /// The current track, if a playlist is loaded.
    pub async fn current_track(&self) -> Option<Track> {
        let inner = self.inner.lock().await;
        inner.tracks.get(inner.state.track_index).cloned()
    }

    /// Copy of the active playlist (durations included once measured).
    pub async fn tracks(&self) -> Vec<Track> {
        self.inner.lock().await.tracks.clone()
    }

    /// Current preferences, for hosts that persist them on change.
    pub async fn preferences(&self) -> PlayerPreferences {
        let inner = self.inner.lock().await;
        PlayerPreferences {
            tts_mode: inner.tts_mode,
            speed: inner.state.speed,
            repeat: inner.state.repeat,
            preferred_voice: inner.preferred_voice.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Locked transitions
    // ------------------------------------------------------------------

    /// Invalidate the running session and release both backends. Both stops
    /// run unconditionally; pending callbacks from the old session die at
    /// the staleness check.
    async fn halt_backends_locked(&self, inner: &mut Inner) {
        inner.session = PlaybackSessionId::new();
        if let Some(clip) = &self.clip {
            clip.stop().await;
        }
        self.speech.stop().await;
    }

    async fn stop_locked(&self, inner: &mut Inner) {
        self.halt_backends_locked(inner).await;
        inner.state.transport = Transport::Stopped;
        inner.state.active_backend = ActiveBackend::None;
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
    }

    async fn jump_to_locked(self: &Arc<Self>, inner: &mut Inner, index: usize) -> Result<()> {
        inner.state.track_index = index;
        if inner.state.is_playing() {
            self.start_current_locked(inner).await
        } else {
            // Track browsing while paused or stopped resets all progress
            // and the resume cursor; the next toggle starts fresh.
            self.halt_backends_locked(inner).await;
            inner.state.transport = Transport::Stopped;
            inner.state.active_backend = ActiveBackend::None;
            Ok(())
        }
    }

    /// Begin playback of the current track under a fresh session.
    async fn start_current_locked(self: &Arc<Self>, inner: &mut Inner) -> Result<()> {
        if inner.tracks.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        let index = inner.state.track_index;
        let track = inner
            .tracks
            .get(index)
            .cloned()
            .ok_or(PlaybackError::NoTrackLoaded)?;

        self.halt_backends_locked(inner).await;
        let session = inner.session;

        let online = match &self.network {
            Some(monitor) => monitor.is_connected().await,
            None => true,
        };
        let backend = if self.clip.is_none() {
            Backend::Speech
        } else {
            select_backend(inner.tts_mode, online)
        };

        inner.state.transport = Transport::Playing;
        inner.state.active_backend = backend.into();
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            track_index: index,
            backend: inner.state.active_backend.as_str().to_string(),
        }));

        let speed = inner.state.speed;
        match backend {
            Backend::Network => {
                let this = Arc::clone(self);
                let voice = inner
                    .preferred_voice
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());
                let model = inner.voice_model.clone();
                tokio::spawn(async move {
                    this.run_network_start(session, track, voice, model, speed)
                        .await;
                });
            }
            Backend::Speech => {
                let this = Arc::clone(self);
                let voice_hint = inner.preferred_voice.clone();
                tokio::spawn(async move {
                    this.run_speech_start(session, track.text, speed, voice_hint)
                        .await;
                });
            }
        }
        Ok(())
    }

    async fn pause_locked(&self, inner: &mut Inner) -> Result<()> {
        match inner.state.active_backend {
            ActiveBackend::Network => {
                if let Some(clip) = &self.clip {
                    clip.pause().await?;
                }
            }
            ActiveBackend::Speech => self.speech.pause().await?,
            ActiveBackend::None => {}
        }
        inner.state.transport = Transport::Paused;
        self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
            track_index: inner.state.track_index,
        }));
        Ok(())
    }

    async fn resume_locked(&self, inner: &mut Inner) -> Result<()> {
        match inner.state.active_backend {
            ActiveBackend::Network => {
                if let Some(clip) = &self.clip {
                    clip.resume().await?;
                }
            }
            ActiveBackend::Speech => self.speech.resume().await?,
            ActiveBackend::None => {}
        }
        inner.state.transport = Transport::Playing;
        self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
            track_index: inner.state.track_index,
        }));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session tasks (run outside the lock, re-validate before acting)
    // ------------------------------------------------------------------

    /// Network start: the slow part (cache lookup or synthesis) runs with
    /// no lock held, then session currency is re-checked before the clip
    /// engine is touched.
    async fn run_network_start(
        self: Arc<Self>,
        session: PlaybackSessionId,
        track: Track,
        voice: String,
        model: Option<String>,
        speed: f32,
    ) {
        let Some(clip) = self.clip.as_ref().map(Arc::clone) else {
            return;
        };

        let prepared = match clip.prepare(&track.text, &voice, model, speed).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.send_signal(session, ControllerEvent::Failed(e));
                return;
            }
        };

        let inner = self.inner.lock().await;
        if inner.session != session {
            debug!(%session, "prepared clip is stale; dropping");
            return;
        }
        if let Err(e) = clip.start(prepared, speed, session).await {
            self.send_signal(session, ControllerEvent::Failed(e));
        }
    }

    /// Speech start. The inner lock is held across `speak` so a superseding
    /// command cannot interleave between the currency check and the engine
    /// call.
    async fn run_speech_start(
        self: Arc<Self>,
        session: PlaybackSessionId,
        text: String,
        speed: f32,
        voice_hint: Option<String>,
    ) {
        let inner = self.inner.lock().await;
        if inner.session != session {
            debug!(%session, "speech start is stale; dropping");
            return;
        }
        if let Err(e) = self
            .speech
            .speak(&text, speed, voice_hint, session)
            .await
        {
            self.send_signal(session, ControllerEvent::Failed(e));
        }
        drop(inner);
    }

    // ------------------------------------------------------------------
    // Signal handling
    // ------------------------------------------------------------------

    async fn handle_signal(self: &Arc<Self>, signal: ControllerSignal) {
        let mut inner = self.inner.lock().await;
        if signal.session != inner.session {
            debug!(session = %signal.session, "dropping stale controller signal");
            return;
        }

        match signal.event {
            ControllerEvent::DurationKnown { duration } => {
                let index = inner.state.track_index;
                if let Some(track) = inner.tracks.get_mut(index) {
                    track.set_measured_duration(duration.as_secs_f64());
                }
                self.emit(CoreEvent::Playback(PlaybackEvent::DurationMeasured {
                    track_index: index,
                    duration_ms: duration.as_millis() as u64,
                }));
            }
            ControllerEvent::Progress {
                position, duration, ..
            } => {
                self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                    track_index: inner.state.track_index,
                    position_ms: position.as_millis() as u64,
                    duration_ms: duration.as_millis() as u64,
                }));
            }
            ControllerEvent::Ended => self.handle_ended_locked(&mut inner).await,
            ControllerEvent::Failed(error) => {
                self.handle_failure_locked(&mut inner, error).await;
            }
        }
    }

    async fn handle_ended_locked(self: &Arc<Self>, inner: &mut Inner) {
        let index = inner.state.track_index;
        let count = inner.tracks.len();
        self.emit(CoreEvent::Playback(PlaybackEvent::TrackCompleted {
            track_index: index,
        }));

        match inner.state.repeat {
            RepeatMode::One => {
                // Replay the same track after a breath; a stop or track
                // change during the delay invalidates the session and the
                // replay evaporates.
                let session = inner.session;
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(REPLAY_DELAY).await;
                    let mut inner = this.inner.lock().await;
                    if inner.session != session || !inner.state.is_playing() {
                        return;
                    }
                    if let Err(e) = this.start_current_locked(&mut inner).await {
                        warn!(error = %e, "repeat-one replay failed");
                    }
                });
            }
            RepeatMode::All => {
                inner.state.track_index = (index + 1) % count;
                if let Err(e) = self.start_current_locked(inner).await {
                    warn!(error = %e, "repeat-all advance failed");
                }
            }
            RepeatMode::None => {
                if index + 1 < count {
                    inner.state.track_index = index + 1;
                    if let Err(e) = self.start_current_locked(inner).await {
                        warn!(error = %e, "track advance failed");
                    }
                } else {
                    self.stop_locked(inner).await;
                }
            }
        }
    }

    async fn handle_failure_locked(self: &Arc<Self>, inner: &mut Inner, error: PlaybackError) {
        let index = inner.state.track_index;

        if error.triggers_fallback() && inner.state.active_backend == ActiveBackend::Network {
            warn!(error = %error, "network backend failed; falling back to speech");
            self.emit(CoreEvent::Playback(PlaybackEvent::BackendFellBack {
                track_index: index,
                reason: error.to_string(),
            }));

            if let Some(clip) = &self.clip {
                clip.stop().await;
            }

            let session = PlaybackSessionId::new();
            inner.session = session;
            inner.state.active_backend = ActiveBackend::Speech;
            inner.state.transport = Transport::Playing;

            let Some(track) = inner.tracks.get(index).cloned() else {
                return;
            };
            let speed = inner.state.speed;
            let voice_hint = inner.preferred_voice.clone();
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.run_speech_start(session, track.text, speed, voice_hint)
                    .await;
            });
            return;
        }

        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            track_index: Some(index),
            message: error.to_string(),
            terminal: true,
        }));
        self.stop_locked(inner).await;
    }

    fn send_signal(&self, session: PlaybackSessionId, event: ControllerEvent) {
        self.signals
            .send(ControllerSignal::new(session, event))
            .ok();
    }

    fn emit(&self, event: CoreEvent) {
        self.bus.emit(event).ok();
    }
}
