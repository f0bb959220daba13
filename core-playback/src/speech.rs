//! Speech-engine playback controller
//!
//! Wraps the platform speech engine, which offers no reliable pause, resume,
//! seek, or live rate change, and on some platforms drops utterances right
//! after they are issued. The controller compensates:
//!
//! - a resume cursor is maintained from every boundary event, so resume can
//!   re-speak only the remaining text when native resume is unavailable,
//!   with progress offsets kept continuous across the restart seam;
//! - speed changes restart the utterance from the cursor, since the engine
//!   cannot change rate on a live utterance;
//! - an utterance the platform cancels before any boundary event, or that
//!   the startup watchdog finds neither speaking nor pending, counts as a
//!   startup failure and is retried with a fixed back-off, up to a cap; the
//!   two detection paths share one counter, reset by the first boundary;
//! - cancellations we caused ourselves (stop, restart, new track) are
//!   filtered out and never surface as errors.
//!
//! Durations are estimates: the engine exposes no real timing, so elapsed
//! and total are derived from character counts at a fixed per-character
//! rate, scaled by speed, and corrected continuously by boundary progress.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use bridge_traits::speech::{
    SpeechCapabilities, SpeechEngine, SpeechEngineEvent, SpeechErrorKind, SpeechVoice,
    UtteranceRequest,
};

use crate::error::{PlaybackError, Result};
use crate::signals::{ControllerEvent, ControllerSignal, PlaybackSessionId, SignalSender};

/// Startup failures tolerated per track before giving up.
const MAX_STARTUP_RETRIES: u32 = 3;

/// Fixed back-off between startup retries.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Heuristic speaking rate used for duration estimates at 1.0x speed. A
/// placeholder, not a timing model; measured durations from the network
/// backend always supersede it where available.
const MS_PER_CHAR: f64 = 150.0;

struct UtteranceContext {
    session: PlaybackSessionId,
    full_text: String,
    total_chars: usize,
    voice_hint: Option<String>,
    speed: f32,
    /// Character offset of the currently issued utterance within the full
    /// text (non-zero after a cursor restart).
    base_chars: usize,
    /// Latest known position in the full text; the resume cursor.
    cursor_chars: usize,
    /// Whether the current utterance has produced a boundary event yet.
    boundary_seen: bool,
}

#[derive(Default)]
struct SpeechShared {
    utterance: Option<UtteranceContext>,
    /// Bumped every time an utterance is handed to the engine; lets delayed
    /// tasks (watchdog, retry) detect that they are stale.
    generation: u64,
    retry_count: u32,
    retry_pending: bool,
    /// Set before every cancel we issue ourselves; the next cancellation
    /// event from the engine is consumed silently.
    expected_cancel: bool,
    paused: bool,
    pump_running: bool,
}

/// Controller for the platform speech-synthesis backend.
#[derive(Clone)]
pub struct SpeechController {
    engine: Arc<dyn SpeechEngine>,
    caps: SpeechCapabilities,
    signals: SignalSender,
    shared: Arc<Mutex<SpeechShared>>,
}

impl SpeechController {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        caps: SpeechCapabilities,
        signals: SignalSender,
    ) -> Self {
        Self {
            engine,
            caps,
            signals,
            shared: Arc::new(Mutex::new(SpeechShared::default())),
        }
    }

    /// Speak a sentence from the beginning. Cancels anything in flight and
    /// resets the resume cursor and the startup-retry counter.
    #[instrument(skip(self, text), fields(%session, text_chars = text.chars().count()))]
    pub async fn speak(
        &self,
        text: &str,
        speed: f32,
        voice_hint: Option<String>,
        session: PlaybackSessionId,
    ) -> Result<()> {
        self.ensure_pump().await?;

        {
            let mut shared = self.shared.lock().await;
            shared.expected_cancel = true;
            self.engine.cancel().await?;
            shared.retry_count = 0;
            shared.retry_pending = false;
            shared.paused = false;
            shared.utterance = Some(UtteranceContext {
                session,
                total_chars: text.chars().count(),
                full_text: text.to_string(),
                voice_hint,
                speed,
                base_chars: 0,
                cursor_chars: 0,
                boundary_seen: false,
            });
        }

        self.issue_current_utterance().await
    }

    /// Best-effort pause. The cursor recorded from boundary events stands
    /// as the fallback checkpoint whatever the engine does with this.
    pub async fn pause(&self) -> Result<()> {
        let mut shared = self.shared.lock().await;
        if shared.utterance.is_none() {
            return Ok(());
        }
        shared.paused = true;

        if self.caps.native_pause_resume {
            self.engine.pause().await?;
        } else {
            // No native pause: silence the engine and rely on the cursor.
            shared.expected_cancel = true;
            self.engine.cancel().await?;
        }
        Ok(())
    }

    /// Resume a paused utterance: natively when the engine reports a paused
    /// state, otherwise by re-speaking the text from the resume cursor.
    pub async fn resume(&self) -> Result<()> {
        let try_native = {
            let mut shared = self.shared.lock().await;
            if shared.utterance.is_none() {
                return Ok(());
            }
            shared.paused = false;
            self.caps.native_pause_resume
        };

        if try_native {
            let status = self.engine.status().await.unwrap_or_default();
            if status.paused {
                self.engine.resume().await?;
                return Ok(());
            }
            debug!("engine lost its paused state; restarting from cursor");
        }

        self.restart_from_cursor().await
    }

    /// Apply a new rate. The engine cannot change rate on a live utterance,
    /// so a speaking utterance is restarted from the cursor; a paused one
    /// just picks the rate up at resume.
    pub async fn set_speed(&self, speed: f32) -> Result<()> {
        let restart = {
            let mut shared = self.shared.lock().await;
            let Some(ctx) = shared.utterance.as_mut() else {
                return Ok(());
            };
            ctx.speed = speed;
            !shared.paused
        };

        if restart {
            self.restart_from_cursor().await
        } else {
            Ok(())
        }
    }

    /// Cancel the utterance and forget all position state. Idempotent.
    pub async fn stop(&self) {
        let mut shared = self.shared.lock().await;
        shared.utterance = None;
        shared.paused = false;
        shared.retry_count = 0;
        shared.retry_pending = false;
        shared.expected_cancel = true;
        if let Err(e) = self.engine.cancel().await {
            warn!(error = %e, "speech cancel failed during stop");
        }
    }

    /// Current resume cursor as a character offset into the full text.
    pub async fn cursor(&self) -> usize {
        self.shared
            .lock()
            .await
            .utterance
            .as_ref()
            .map(|ctx| ctx.cursor_chars)
            .unwrap_or(0)
    }

    /// Cancel and re-issue the current utterance from the cursor.
    async fn restart_from_cursor(&self) -> Result<()> {
        {
            let mut shared = self.shared.lock().await;
            if shared.utterance.is_none() {
                return Ok(());
            }
            shared.expected_cancel = true;
            self.engine.cancel().await?;
        }
        self.issue_current_utterance().await
    }

    /// Hand the remaining text to the engine: settle after the preceding
    /// cancel, snapshot the utterance, resolve a voice, speak, and arm the
    /// startup watchdog.
    async fn issue_current_utterance(&self) -> Result<()> {
        let settle = self.caps.cancel_settling_delay;
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let (remaining, speed, voice_hint, generation) = {
            let mut shared = self.shared.lock().await;
            let Some(ctx) = shared.utterance.as_mut() else {
                // Superseded by stop while settling.
                return Ok(());
            };
            ctx.base_chars = ctx.cursor_chars;
            ctx.boundary_seen = false;
            let remaining: String = ctx.full_text.chars().skip(ctx.cursor_chars).collect();
            let snapshot = (remaining, ctx.speed, ctx.voice_hint.clone());
            shared.generation += 1;
            shared.retry_pending = false;
            (snapshot.0, snapshot.1, snapshot.2, shared.generation)
        };

        if remaining.trim().is_empty() {
            // Resumed past the end of the text; the track is done.
            let mut shared = self.shared.lock().await;
            if let Some(ctx) = shared.utterance.take() {
                self.send(ctx.session, ControllerEvent::Ended);
            }
            return Ok(());
        }

        let voice = self.resolve_voice(voice_hint.as_deref()).await;
        let request = UtteranceRequest::new(remaining)
            .with_rate(speed)
            .with_voice(voice);

        {
            let mut shared = self.shared.lock().await;
            if shared.generation != generation || shared.utterance.is_none() {
                // A newer speak or a stop won the race.
                return Ok(());
            }
            self.engine.speak(request).await?;
            shared.expected_cancel = false;
        }

        self.spawn_watchdog(generation);
        Ok(())
    }

    /// Pick a voice for the utterance: the explicit hint when it resolves
    /// among available (and allowed) voices, else the best language match,
    /// preferring locally hosted voices. `None` leaves the engine default.
    async fn resolve_voice(&self, hint: Option<&str>) -> Option<String> {
        let voices = match self.engine.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!(error = %e, "voice listing failed; using engine default");
                return None;
            }
        };
        select_voice(&voices, hint, &self.caps, "en")
    }

    async fn ensure_pump(&self) -> Result<()> {
        {
            let mut shared = self.shared.lock().await;
            if shared.pump_running {
                return Ok(());
            }
            shared.pump_running = true;
        }

        let stream = match self.engine.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                self.shared.lock().await.pump_running = false;
                return Err(e.into());
            }
        };

        let this = self.clone();
        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(event) = stream.next().await {
                match event {
                    SpeechEngineEvent::Boundary { char_index } => {
                        this.on_boundary(char_index).await;
                    }
                    SpeechEngineEvent::Ended => this.on_ended().await,
                    SpeechEngineEvent::Error { kind, char_index } => {
                        this.on_engine_error(kind, char_index).await;
                    }
                }
            }
        });
        Ok(())
    }

    async fn on_boundary(&self, char_index: usize) {
        let mut shared = self.shared.lock().await;
        if shared.expected_cancel {
            // Trailing event from an utterance we just cancelled.
            return;
        }
        shared.retry_count = 0;
        let Some(ctx) = shared.utterance.as_mut() else {
            return;
        };
        ctx.boundary_seen = true;
        ctx.cursor_chars = (ctx.base_chars + char_index).min(ctx.total_chars);

        let fraction = if ctx.total_chars > 0 {
            ctx.cursor_chars as f64 / ctx.total_chars as f64
        } else {
            1.0
        };
        let total_ms = ctx.total_chars as f64 * MS_PER_CHAR / f64::from(ctx.speed);
        let elapsed_ms = fraction * total_ms;
        let session = ctx.session;

        self.send(
            session,
            ControllerEvent::Progress {
                position: Duration::from_secs_f64(elapsed_ms / 1000.0),
                duration: Duration::from_secs_f64(total_ms / 1000.0),
                fraction,
            },
        );
    }

    async fn on_ended(&self) {
        let mut shared = self.shared.lock().await;
        if shared.expected_cancel {
            // Some engines report a cancelled utterance as ended.
            shared.expected_cancel = false;
            return;
        }
        shared.paused = false;
        if let Some(ctx) = shared.utterance.take() {
            self.send(ctx.session, ControllerEvent::Ended);
        }
    }

    async fn on_engine_error(&self, kind: SpeechErrorKind, char_index: usize) {
        let mut shared = self.shared.lock().await;
        match kind {
            // Interruption by a newer utterance or an explicit cancel is
            // expected behavior, not an error.
            SpeechErrorKind::Interrupted => {}
            SpeechErrorKind::Canceled => {
                if shared.expected_cancel {
                    shared.expected_cancel = false;
                    return;
                }
                let Some(ctx) = shared.utterance.as_ref() else {
                    return;
                };
                if !ctx.boundary_seen {
                    debug!(char_index, "utterance dropped before any boundary");
                    self.startup_failure_locked(&mut shared);
                } else {
                    let session = ctx.session;
                    shared.utterance = None;
                    self.send(
                        session,
                        ControllerEvent::Failed(PlaybackError::SpeechRuntime(
                            "utterance canceled by the platform mid-speech".to_string(),
                        )),
                    );
                }
            }
            SpeechErrorKind::Other(message) => {
                if let Some(ctx) = shared.utterance.take() {
                    self.send(
                        ctx.session,
                        ControllerEvent::Failed(PlaybackError::SpeechRuntime(message)),
                    );
                }
            }
        }
    }

    /// Shared startup-failure path for spontaneous cancels and watchdog
    /// timeouts. Retries with a fixed back-off until the cap, then surfaces
    /// a terminal error.
    fn startup_failure_locked(&self, shared: &mut SpeechShared) {
        if shared.retry_pending {
            return;
        }
        if shared.retry_count >= MAX_STARTUP_RETRIES {
            shared.retry_count = 0;
            if let Some(ctx) = shared.utterance.take() {
                self.send(
                    ctx.session,
                    ControllerEvent::Failed(PlaybackError::SpeechStartup {
                        attempts: MAX_STARTUP_RETRIES,
                    }),
                );
            }
            return;
        }

        shared.retry_count += 1;
        shared.retry_pending = true;
        let generation = shared.generation;
        let attempt = shared.retry_count;
        debug!(attempt, "speech startup failed; scheduling retry");

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RETRY_BACKOFF).await;

            let session = {
                let mut shared = this.shared.lock().await;
                if shared.generation != generation || shared.paused {
                    shared.retry_pending = false;
                    return;
                }
                let Some(ctx) = shared.utterance.as_ref() else {
                    shared.retry_pending = false;
                    return;
                };
                let session = ctx.session;
                shared.expected_cancel = true;
                if let Err(e) = this.engine.cancel().await {
                    warn!(error = %e, "cancel before retry failed");
                }
                session
            };

            if let Err(e) = this.issue_current_utterance().await {
                this.send(session, ControllerEvent::Failed(e));
            }
        });
    }

    /// Shortly after issuing speech, confirm the engine actually took it.
    /// An engine that is neither speaking nor pending dropped the utterance
    /// without telling us; that is a startup failure like any other.
    fn spawn_watchdog(&self, generation: u64) {
        let this = self.clone();
        let delay = self.caps.startup_watchdog_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let shared = this.shared.lock().await;
                let current = shared.generation == generation
                    && !shared.paused
                    && shared
                        .utterance
                        .as_ref()
                        .is_some_and(|ctx| !ctx.boundary_seen);
                if !current {
                    return;
                }
            }

            let status = this.engine.status().await.unwrap_or_default();
            if !status.is_silent() {
                return;
            }

            let mut shared = this.shared.lock().await;
            let still_current = shared.generation == generation
                && !shared.paused
                && shared
                    .utterance
                    .as_ref()
                    .is_some_and(|ctx| !ctx.boundary_seen);
            if still_current {
                debug!("watchdog found the engine silent after speak");
                this.startup_failure_locked(&mut shared);
            }
        });
    }

    fn send(&self, session: PlaybackSessionId, event: ControllerEvent) {
        self.signals.send(ControllerSignal::new(session, event)).ok();
    }
}

/// Voice selection policy, split out for testing.
///
/// The allowlist constrains local voices on engines known to list voices
/// that do not actually work; when filtering would leave nothing, the full
/// list is used rather than failing outright.
fn select_voice(
    voices: &[SpeechVoice],
    hint: Option<&str>,
    caps: &SpeechCapabilities,
    language_prefix: &str,
) -> Option<String> {
    let allowed: Vec<&SpeechVoice> = voices.iter().filter(|v| caps.allows(v)).collect();
    let candidates: Vec<&SpeechVoice> = if allowed.is_empty() {
        voices.iter().collect()
    } else {
        allowed
    };

    if let Some(hint) = hint {
        if let Some(voice) = candidates.iter().find(|v| v.name == hint) {
            return Some(voice.name.clone());
        }
    }

    candidates
        .iter()
        .find(|v| v.matches_language(language_prefix) && v.local)
        .or_else(|| {
            candidates
                .iter()
                .find(|v| v.matches_language(language_prefix))
        })
        .map(|v| v.name.clone())
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
    fn explicit_hint_wins_when_resolvable() {
        let voices = vec![
            voice("Daniel", "en-GB", true),
            voice("Samantha", "en-US", true),
        ];
        let caps = SpeechCapabilities::default();
        assert_eq!(
            select_voice(&voices, Some("Samantha"), &caps, "en"),
            Some("Samantha".to_string())
        );
    }

    #[test]
    fn unresolvable_hint_falls_back_to_best_match() {
        let voices = vec![
            voice("Google US English", "en-US", false),
            voice("Samantha", "en-US", true),
        ];
        let caps = SpeechCapabilities::default();
        // Local voices are preferred over network-hosted ones.
        assert_eq!(
            select_voice(&voices, Some("Ghost"), &caps, "en"),
            Some("Samantha".to_string())
        );
    }

    #[test]
    fn allowlist_excludes_broken_local_voices() {
        let voices = vec![
            voice("Eloquence", "en-US", true),
            voice("Samantha", "en-US", true),
        ];
        let caps = SpeechCapabilities::restricted()
            .with_allowlist(vec!["Samantha".to_string()]);
        assert_eq!(
            select_voice(&voices, Some("Eloquence"), &caps, "en"),
            Some("Samantha".to_string())
        );
    }

    #[test]
    fn empty_filter_result_uses_all_voices() {
        let voices = vec![voice("Yuna", "ko-KR", true), voice("Kyoko", "ja-JP", true)];
        let caps =
            SpeechCapabilities::restricted().with_allowlist(vec!["Samantha".to_string()]);
        // Nothing allowed and nothing English: engine default.
        assert_eq!(select_voice(&voices, None, &caps, "en"), None);
    }

    #[test]
    fn no_english_voice_means_engine_default() {
        let voices = vec![voice("Yuna", "ko-KR", true)];
        let caps = SpeechCapabilities::default();
        assert_eq!(select_voice(&voices, None, &caps, "en"), None);
    }
}
