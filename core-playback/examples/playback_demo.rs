//! Minimal end-to-end run of the playback core against a simulated speech
//! engine. Loads the sample playlist, plays two tracks, and prints the
//! events the orchestrator emits.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use bridge_traits::speech::{
    EngineStatus, SpeechEngine, SpeechEngineEvent, SpeechEventStream, SpeechVoice,
    UtteranceRequest,
};
use bridge_traits::storage::MemorySettingsStore;
use core_library::models::sample_tracks;
use core_playback::{MemoryCacheBackend, PlaybackOrchestrator};
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::{init_logging, LoggingConfig};

/// Speech engine that "speaks" by emitting a boundary every few characters
/// on a timer, then ending the utterance.
#[derive(Default)]
struct SimulatedSpeechEngine {
    events: Mutex<Option<UnboundedSender<SpeechEngineEvent>>>,
    speaking: Mutex<bool>,
}

#[async_trait]
impl SpeechEngine for SimulatedSpeechEngine {
    async fn voices(&self) -> bridge_traits::error::Result<Vec<SpeechVoice>> {
        Ok(vec![SpeechVoice {
            name: "Demo English".to_string(),
            language: "en-US".to_string(),
            local: true,
            default_voice: true,
        }])
    }

    async fn speak(&self, request: UtteranceRequest) -> bridge_traits::error::Result<()> {
        *self.speaking.lock().unwrap() = true;
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let chars = request.text.chars().count();
            tokio::spawn(async move {
                for index in (0..chars).step_by(4) {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    if tx
                        .send(SpeechEngineEvent::Boundary { char_index: index })
                        .is_err()
                    {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(40)).await;
                tx.send(SpeechEngineEvent::Ended).ok();
            });
        }
        Ok(())
    }

    async fn cancel(&self) -> bridge_traits::error::Result<()> {
        *self.speaking.lock().unwrap() = false;
        Ok(())
    }

    async fn pause(&self) -> bridge_traits::error::Result<()> {
        Ok(())
    }

    async fn resume(&self) -> bridge_traits::error::Result<()> {
        Ok(())
    }

    async fn status(&self) -> bridge_traits::error::Result<EngineStatus> {
        Ok(EngineStatus {
            speaking: *self.speaking.lock().unwrap(),
            pending: false,
            paused: false,
        })
    }

    async fn subscribe(&self) -> bridge_traits::error::Result<Box<dyn SpeechEventStream>> {
        let (tx, rx) = unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        Ok(Box::new(ChannelStream { rx }))
    }
}

struct ChannelStream {
    rx: UnboundedReceiver<SpeechEngineEvent>,
}

#[async_trait]
impl SpeechEventStream for ChannelStream {
    async fn next(&mut self) -> Option<SpeechEngineEvent> {
        self.rx.recv().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::default())?;

    let config = SessionConfig::builder()
        .speech_engine(Arc::new(SimulatedSpeechEngine::default()))
        .settings_store(Arc::new(MemorySettingsStore::new()))
        .build()?;

    let bus = EventBus::new(128);
    let mut events = bus.subscribe();
    let orchestrator =
        PlaybackOrchestrator::new(config, Arc::new(MemoryCacheBackend::new()), bus.clone());
    orchestrator.initialize().await;

    orchestrator.load_playlist(sample_tracks()).await;
    orchestrator.toggle_play().await?;

    let mut completed = 0;
    while let Ok(event) = events.recv().await {
        println!(
            "{:>7} | {}",
            format!("{:?}", event.severity()),
            event.description()
        );
        if matches!(
            event,
            CoreEvent::Playback(PlaybackEvent::TrackCompleted { .. })
        ) {
            completed += 1;
            if completed == 2 {
                break;
            }
        }
    }

    orchestrator.stop().await;
    println!("done.");
    Ok(())
}
