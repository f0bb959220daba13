//! TTS backend selection
//!
//! Pure policy over (user preference, connectivity). Whether the session has
//! the network path configured at all is the orchestrator's concern; this
//! function only arbitrates preference versus connectivity.

use core_runtime::config::TtsMode;

use crate::state::ActiveBackend;

/// Which backend a play request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Fetch (or reuse) a synthesized clip.
    Network,
    /// Speak through the platform engine.
    Speech,
}

impl From<Backend> for ActiveBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Network => ActiveBackend::Network,
            Backend::Speech => ActiveBackend::Speech,
        }
    }
}

/// Select the backend for one play request.
///
/// - A forced speech-only preference always wins.
/// - Without connectivity the speech engine is the only option.
/// - Otherwise the network backend is preferred for its exact pause/resume
///   and live rate control.
pub fn select_backend(mode: TtsMode, online: bool) -> Backend {
    match mode {
        TtsMode::SpeechOnly => Backend::Speech,
        _ if !online => Backend::Speech,
        _ => Backend::Network,
    }
}
