//! Cloud Synthesis Collaborator
//!
//! The interface to the network text-to-speech collaborator: synthesize a
//! sentence into an encoded audio clip, and list the voices the service
//! offers. Implementations live in provider crates; the playback core only
//! sees this trait.
//!
//! Rate is deliberately absent from the synthesis call's effect on audio:
//! providers synthesize at 1.0x and the clip engine applies the playback
//! rate, so cached audio stays valid across speed changes.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::PlatformSendSync;

/// Maximum text length a synthesis request may carry, in characters.
pub const MAX_SYNTHESIS_TEXT_CHARS: usize = 5000;

/// Inclusive playback-speed bounds accepted by the core.
pub const MIN_PLAYBACK_SPEED: f32 = 0.25;
pub const MAX_PLAYBACK_SPEED: f32 = 4.0;

/// A single synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Sentence to synthesize.
    pub text: String,
    /// Provider voice identifier (e.g. "en-US-Standard-F").
    pub voice_id: String,
    /// BCP-47 language tag for the voice.
    pub language_code: String,
    /// Provider model identifier, required by some voice families.
    pub model_id: Option<String>,
    /// Requested playback speed. Forwarded for bookkeeping only; audio is
    /// synthesized at 1.0x.
    pub speed: f32,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        let voice_id = voice_id.into();
        let language_code = language_code_of(&voice_id);
        Self {
            text: text.into(),
            voice_id,
            language_code,
            model_id: None,
            speed: 1.0,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_model(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }

    /// Check the request against the collaborator's documented input limits.
    /// Rejected requests must never be submitted.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.is_empty() {
            return Err("text must not be empty".to_string());
        }
        if self.text.chars().count() > MAX_SYNTHESIS_TEXT_CHARS {
            return Err(format!(
                "text too long (max {} characters)",
                MAX_SYNTHESIS_TEXT_CHARS
            ));
        }
        if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&self.speed) {
            return Err(format!(
                "speed must be between {} and {}",
                MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED
            ));
        }
        Ok(())
    }
}

/// Derive a language tag from a structured voice identifier
/// ("en-US-Standard-F" -> "en-US"). Falls back to "en-US".
pub fn language_code_of(voice_id: &str) -> String {
    let mut parts = voice_id.splitn(3, '-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region))
            if lang.len() == 2
                && region.len() == 2
                && lang.chars().all(|c| c.is_ascii_lowercase())
                && region.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            format!("{}-{}", lang, region)
        }
        _ => "en-US".to_string(),
    }
}

/// A successfully synthesized clip.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Encoded audio (MP3) at 1.0x speed.
    pub audio: Bytes,
    /// Provider-side duration estimate. A placeholder until the clip engine
    /// measures the real duration from the decoded media.
    pub estimated_duration: Duration,
}

/// A voice offered by the synthesis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Provider voice identifier.
    pub id: String,
    /// BCP-47 language tag.
    pub language_code: String,
    /// Provider-reported gender label (e.g. "FEMALE").
    pub gender: Option<String>,
    /// Human-readable label derived from the voice family.
    pub display_name: String,
    /// Model identifier, when the voice requires one.
    pub model_id: Option<String>,
}

/// Classification of a failed collaborator call, mirrored from the HTTP-like
/// status the service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Credential rejected (401/403).
    Auth,
    /// Usage quota exhausted (429).
    Quota,
    /// Transport-level failure; no status was received.
    Network,
    /// Any other service-reported failure.
    Other,
}

/// Error reported by a synthesis collaborator.
#[derive(Error, Debug, Clone)]
#[error("synthesis failed ({kind:?}): {message}")]
pub struct SynthesisFailure {
    pub kind: SynthesisErrorKind,
    pub message: String,
}

impl SynthesisFailure {
    pub fn new(kind: SynthesisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a service status code the way the playback core expects:
    /// 401/403 are credential failures, 429 is quota exhaustion, everything
    /// else is `Other`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => SynthesisErrorKind::Auth,
            429 => SynthesisErrorKind::Quota,
            _ => SynthesisErrorKind::Other,
        };
        Self::new(kind, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Network, message)
    }
}

/// Network text-to-speech collaborator.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SynthesisProvider: PlatformSendSync {
    /// Synthesize a sentence into an encoded audio clip.
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisFailure>;

    /// List the voices available for a language.
    async fn list_voices(
        &self,
        language_code: &str,
    ) -> Result<Vec<VoiceDescriptor>, SynthesisFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_bounds() {
        let ok = SynthesisRequest::new("Hello there.", "en-US-Standard-F");
        assert!(ok.validate().is_ok());

        let empty = SynthesisRequest::new("", "en-US-Standard-F");
        assert!(empty.validate().is_err());

        let long = SynthesisRequest::new("a".repeat(5001), "en-US-Standard-F");
        assert!(long.validate().is_err());

        let fast = SynthesisRequest::new("hi", "en-US-Standard-F").with_speed(4.5);
        assert!(fast.validate().is_err());

        let slow = SynthesisRequest::new("hi", "en-US-Standard-F").with_speed(0.25);
        assert!(slow.validate().is_ok());
    }

    #[test]
    fn language_code_derivation() {
        assert_eq!(language_code_of("en-GB-Standard-A"), "en-GB");
        assert_eq!(language_code_of("en-US-Neural2-D"), "en-US");
        // Unstructured identifiers fall back to en-US.
        assert_eq!(language_code_of("Samantha"), "en-US");
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            SynthesisFailure::from_status(401, "denied").kind,
            SynthesisErrorKind::Auth
        );
        assert_eq!(
            SynthesisFailure::from_status(403, "denied").kind,
            SynthesisErrorKind::Auth
        );
        assert_eq!(
            SynthesisFailure::from_status(429, "quota").kind,
            SynthesisErrorKind::Quota
        );
        assert_eq!(
            SynthesisFailure::from_status(500, "boom").kind,
            SynthesisErrorKind::Other
        );
    }
}
