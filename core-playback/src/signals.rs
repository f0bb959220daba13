//! Controller-to-orchestrator signals
//!
//! Both playback controllers report progress, completion, and failure as
//! [`ControllerSignal`]s on one channel. Every signal carries the
//! [`PlaybackSessionId`] it was issued under; the orchestrator drops signals
//! whose session is no longer current, so a slow in-flight operation can
//! never mutate state after a newer command superseded it.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::PlaybackError;

/// Identity of one playback attempt.
///
/// A fresh id is generated every time the orchestrator starts, restarts, or
/// stops playback; anything still running under an older id is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What a controller has to say.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The real clip duration became known (network backend only, measured
    /// at 1.0x; fires once per load).
    DurationKnown { duration: Duration },

    /// Playback advanced. On the network backend `position`/`duration` are
    /// measured; on the speech backend they are estimates derived from
    /// character boundaries.
    Progress {
        position: Duration,
        duration: Duration,
        /// Completed fraction in `0.0..=1.0`.
        fraction: f64,
    },

    /// The track finished naturally.
    Ended,

    /// The controller failed. Whether the orchestrator falls back or halts
    /// is decided by [`PlaybackError::triggers_fallback`].
    Failed(PlaybackError),
}

/// One signal from a controller.
#[derive(Debug, Clone)]
pub struct ControllerSignal {
    pub session: PlaybackSessionId,
    pub event: ControllerEvent,
}

impl ControllerSignal {
    pub fn new(session: PlaybackSessionId, event: ControllerEvent) -> Self {
        Self { session, event }
    }
}

/// Sending half of the signal channel, handed to each controller.
pub type SignalSender = mpsc::UnboundedSender<ControllerSignal>;

/// Receiving half, owned by the orchestrator's signal loop.
pub type SignalReceiver = mpsc::UnboundedReceiver<ControllerSignal>;

/// Create the signal channel.
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}
