//! Scripted engines and fixtures shared by the integration suites.
//!
//! The engines record every call and let tests inject engine events, so
//! orchestrator scenarios run without any real audio or network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{ClipEngine, ClipEvent, ClipEventStream, ClipHandle};
use bridge_traits::speech::{
    EngineStatus, SpeechCapabilities, SpeechEngine, SpeechEngineEvent, SpeechEventStream,
    SpeechVoice, UtteranceRequest,
};
use bridge_traits::storage::MemorySettingsStore;
use bridge_traits::synthesis::{
    SynthesisFailure, SynthesisProvider, SynthesisRequest, SynthesizedAudio, VoiceDescriptor,
};
use bridge_traits::{NetworkMonitor, StaticNetworkMonitor};
use core_library::models::Track;
use core_runtime::config::{PlayerPreferences, SessionConfig};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_playback::cache::MemoryCacheBackend;
use core_playback::PlaybackOrchestrator;

// ============================================================================
// Scripted speech engine
// ============================================================================

#[derive(Default)]
struct SpeechEngineState {
    events: Option<UnboundedSender<SpeechEngineEvent>>,
    spoken: Vec<UtteranceRequest>,
    cancels: usize,
    pauses: usize,
    resumes: usize,
    status: EngineStatus,
    voices: Vec<SpeechVoice>,
    /// When set, `speak` leaves the engine silent so the startup watchdog
    /// trips.
    silent_after_speak: bool,
}

/// Speech engine whose events are injected by the test.
#[derive(Default)]
pub struct ScriptedSpeechEngine {
    state: Mutex<SpeechEngineState>,
}

impl ScriptedSpeechEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_voices(voices: Vec<SpeechVoice>) -> Arc<Self> {
        let engine = Self::default();
        engine.state.lock().unwrap().voices = voices;
        Arc::new(engine)
    }

    pub fn set_silent_after_speak(&self, silent: bool) {
        self.state.lock().unwrap().silent_after_speak = silent;
    }

    /// Inject an engine event as if the platform emitted it.
    pub fn emit(&self, event: SpeechEngineEvent) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = &state.events {
            tx.send(event).ok();
        }
    }

    pub fn spoken(&self) -> Vec<UtteranceRequest> {
        self.state.lock().unwrap().spoken.clone()
    }

    pub fn spoken_count(&self) -> usize {
        self.state.lock().unwrap().spoken.len()
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancels
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().unwrap().pauses
    }
}

#[async_trait]
impl SpeechEngine for ScriptedSpeechEngine {
    async fn voices(&self) -> BridgeResult<Vec<SpeechVoice>> {
        Ok(self.state.lock().unwrap().voices.clone())
    }

    async fn speak(&self, request: UtteranceRequest) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.spoken.push(request);
        state.status = if state.silent_after_speak {
            EngineStatus::default()
        } else {
            EngineStatus {
                speaking: true,
                pending: false,
                paused: false,
            }
        };
        Ok(())
    }

    async fn cancel(&self) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.cancels += 1;
        state.status = EngineStatus::default();
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.pauses += 1;
        state.status.paused = true;
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.resumes += 1;
        state.status.paused = false;
        state.status.speaking = true;
        Ok(())
    }

    async fn status(&self) -> BridgeResult<EngineStatus> {
        Ok(self.state.lock().unwrap().status)
    }

    async fn subscribe(&self) -> BridgeResult<Box<dyn SpeechEventStream>> {
        let (tx, rx) = unbounded_channel();
        self.state.lock().unwrap().events = Some(tx);
        Ok(Box::new(ChannelSpeechStream { rx }))
    }
}

struct ChannelSpeechStream {
    rx: UnboundedReceiver<SpeechEngineEvent>,
}

#[async_trait]
impl SpeechEventStream for ChannelSpeechStream {
    async fn next(&mut self) -> Option<SpeechEngineEvent> {
        self.rx.recv().await
    }
}

// ============================================================================
// Scripted clip engine
// ============================================================================

#[derive(Default)]
struct ClipEngineState {
    current: Option<UnboundedSender<ClipEvent>>,
    opened: Vec<Bytes>,
    plays: usize,
    pauses: usize,
    rates: Vec<f32>,
    releases: usize,
}

/// Clip engine whose events are injected by the test.
#[derive(Default)]
pub struct ScriptedClipEngine {
    state: Arc<Mutex<ClipEngineState>>,
}

impl ScriptedClipEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inject an event into the most recently subscribed clip.
    pub fn emit(&self, event: ClipEvent) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = &state.current {
            tx.send(event).ok();
        }
    }

    pub fn opened(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn rates(&self) -> Vec<f32> {
        self.state.lock().unwrap().rates.clone()
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().unwrap().releases
    }
}

#[async_trait]
impl ClipEngine for ScriptedClipEngine {
    async fn open(&self, data: Bytes) -> BridgeResult<Box<dyn ClipHandle>> {
        self.state.lock().unwrap().opened.push(data);
        Ok(Box::new(ScriptedClipHandle {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

struct ScriptedClipHandle {
    state: Arc<Mutex<ClipEngineState>>,
    released: bool,
}

#[async_trait]
impl ClipHandle for ScriptedClipHandle {
    async fn play(&mut self) -> BridgeResult<()> {
        self.state.lock().unwrap().plays += 1;
        Ok(())
    }

    async fn pause(&mut self) -> BridgeResult<()> {
        self.state.lock().unwrap().pauses += 1;
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32) -> BridgeResult<()> {
        self.state.lock().unwrap().rates.push(rate);
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }

    async fn release(&mut self) -> BridgeResult<()> {
        if !self.released {
            self.released = true;
            let mut state = self.state.lock().unwrap();
            state.releases += 1;
            // Ends the event stream for this clip.
            state.current = None;
        }
        Ok(())
    }

    async fn subscribe(&mut self) -> BridgeResult<Box<dyn ClipEventStream>> {
        let (tx, rx) = unbounded_channel();
        self.state.lock().unwrap().current = Some(tx);
        Ok(Box::new(ChannelClipStream { rx }))
    }
}

struct ChannelClipStream {
    rx: UnboundedReceiver<ClipEvent>,
}

#[async_trait]
impl ClipEventStream for ChannelClipStream {
    async fn next(&mut self) -> Option<ClipEvent> {
        self.rx.recv().await
    }
}

// ============================================================================
// Stub synthesis collaborator
// ============================================================================

enum SynthesisScript {
    /// Succeed, returning the request text as the audio payload so tests
    /// can check which sentence was synthesized.
    EchoText,
    /// Fail every call with this failure.
    Fail(SynthesisFailure),
    /// Pop queued outcomes, front first; falls back to `EchoText` when
    /// drained.
    Queue(VecDeque<Result<(), SynthesisFailure>>),
}

/// Synthesis collaborator with scriptable outcomes and an optional gate
/// that holds calls until the test releases them.
pub struct StubSynthesis {
    script: Mutex<SynthesisScript>,
    calls: Mutex<Vec<SynthesisRequest>>,
    gate: Option<Semaphore>,
}

impl StubSynthesis {
    pub fn echoing() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(SynthesisScript::EchoText),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn failing(failure: SynthesisFailure) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(SynthesisScript::Fail(failure)),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Like `echoing`, but every call blocks until [`Self::release`].
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(SynthesisScript::EchoText),
            calls: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn calls(&self) -> Vec<SynthesisRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisProvider for StubSynthesis {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisFailure> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        let outcome = {
            let mut script = self.script.lock().unwrap();
            match &mut *script {
                SynthesisScript::EchoText => Ok(()),
                SynthesisScript::Fail(failure) => Err(failure.clone()),
                SynthesisScript::Queue(queue) => queue.pop_front().unwrap_or(Ok(())),
            }
        };
        outcome?;

        let estimated =
            Duration::from_millis((request.text.chars().count() as u64) * 150);
        Ok(SynthesizedAudio {
            audio: Bytes::from(request.text.into_bytes()),
            estimated_duration: estimated,
        })
    }

    async fn list_voices(
        &self,
        _language_code: &str,
    ) -> Result<Vec<VoiceDescriptor>, SynthesisFailure> {
        Ok(Vec::new())
    }
}

/// Cache backend that fails every operation, for degradation tests.
pub struct FailingCacheBackend;

#[async_trait]
impl core_playback::AudioCacheBackend for FailingCacheBackend {
    async fn get(
        &self,
        _key: &str,
    ) -> BridgeResult<Option<core_playback::cache::CacheEntry>> {
        Err(BridgeError::StorageError("backend down".to_string()))
    }

    async fn put(&self, _entry: core_playback::cache::CacheEntry) -> BridgeResult<()> {
        Err(BridgeError::StorageError("backend down".to_string()))
    }

    async fn delete(&self, _key: &str) -> BridgeResult<()> {
        Err(BridgeError::StorageError("backend down".to_string()))
    }

    async fn entries(&self) -> BridgeResult<Vec<core_playback::cache::CacheEntry>> {
        Err(BridgeError::StorageError("backend down".to_string()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Fixture {
    pub orchestrator: Arc<PlaybackOrchestrator>,
    pub speech: Arc<ScriptedSpeechEngine>,
    pub clip: Arc<ScriptedClipEngine>,
    pub synthesis: Arc<StubSynthesis>,
    pub bus: EventBus,
    pub events: Receiver<CoreEvent>,
}

pub fn sample(count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| Track::new(format!("Sentence number {i}."), format!("문장 {i}.")))
        .collect()
}

async fn build_fixture(
    tracks: Vec<Track>,
    with_network_path: bool,
    synthesis: Arc<StubSynthesis>,
    caps: SpeechCapabilities,
    monitor: Option<Arc<dyn NetworkMonitor>>,
) -> Fixture {
    let speech = ScriptedSpeechEngine::new();
    let clip = ScriptedClipEngine::new();

    let mut builder = SessionConfig::builder()
        .speech_engine(speech.clone())
        .settings_store(Arc::new(MemorySettingsStore::new()))
        .speech_capabilities(caps)
        .preferences(PlayerPreferences::default());
    if with_network_path {
        builder = builder
            .clip_engine(clip.clone())
            .synthesis_provider(synthesis.clone());
    }
    if let Some(monitor) = monitor {
        builder = builder.network_monitor(monitor);
    }
    let config = builder.build().expect("fixture config");

    let bus = EventBus::new(256);
    let events = bus.subscribe();
    let orchestrator =
        PlaybackOrchestrator::new(config, Arc::new(MemoryCacheBackend::new()), bus.clone());
    orchestrator.initialize().await;
    orchestrator.load_playlist(tracks).await;

    Fixture {
        orchestrator,
        speech,
        clip,
        synthesis,
        bus,
        events,
    }
}

/// Speech-only session: no clip engine, no synthesis collaborator.
pub async fn speech_only_fixture(tracks: Vec<Track>) -> Fixture {
    build_fixture(
        tracks,
        false,
        StubSynthesis::echoing(),
        SpeechCapabilities::default(),
        None,
    )
    .await
}

pub async fn speech_only_fixture_with_caps(
    tracks: Vec<Track>,
    caps: SpeechCapabilities,
) -> Fixture {
    build_fixture(tracks, false, StubSynthesis::echoing(), caps, None).await
}

/// Full session with the network path online.
pub async fn network_fixture(tracks: Vec<Track>, synthesis: Arc<StubSynthesis>) -> Fixture {
    build_fixture(
        tracks,
        true,
        synthesis,
        SpeechCapabilities::default(),
        Some(Arc::new(StaticNetworkMonitor::online())),
    )
    .await
}

// ============================================================================
// Async assertions
// ============================================================================

/// Poll a condition until it holds or the deadline passes. Under a paused
/// runtime the sleeps auto-advance, so this is fast and deterministic.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition was not met within the deadline");
}

/// Async-condition variant of [`wait_until`].
pub async fn wait_until_async<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition was not met within the deadline");
}

/// Drain currently queued bus events into a vector.
pub fn drain_events(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
