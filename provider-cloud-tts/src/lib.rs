//! # Cloud TTS Provider
//!
//! Client for the cloud text-to-speech collaborator: sentence synthesis and
//! voice listing over the [`HttpClient`](bridge_traits::HttpClient) bridge,
//! with HTTP statuses classified into the playback core's error taxonomy
//! (401/403 credential, 429 quota, transport, other).
//!
//! The API credential lives in process memory only ([`credentials`]): it is
//! never serialized, never persisted, redacted from `Debug` output, and
//! cleared explicitly at session end.
//!
//! Synthesis always requests audio at 1.0x speed; playback rate is applied
//! by the clip engine, which is what keeps cached audio valid across speed
//! changes.

pub mod client;
pub mod credentials;
pub mod error;
pub mod wire;

#[cfg(feature = "native-http")]
mod http_reqwest;

pub use client::{format_voice_label, CloudTtsClient, STANDARD_VOICE_PREFIXES};
pub use credentials::{ApiCredential, CredentialSlot};
pub use error::{CloudTtsError, Result};

#[cfg(feature = "native-http")]
pub use http_reqwest::ReqwestHttpClient;
