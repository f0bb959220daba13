//! Wire types for the cloud TTS REST API
//!
//! Request/response shapes for `text:synthesize` and `voices`, plus the
//! SSML wrapping applied to sentence text. `speaking_rate` is pinned to
//! 1.0: rate is a playback-time concern handled by the clip engine, never a
//! synthesis-time one.

use serde::{Deserialize, Serialize};

/// Body of a `text:synthesize` call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequestBody {
    pub input: SsmlInput,
    pub voice: VoiceSelection,
    pub audio_config: AudioConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SsmlInput {
    pub ssml: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub audio_encoding: String,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            audio_encoding: "MP3".to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
            volume_gain_db: 0.0,
        }
    }
}

/// Body of a successful `text:synthesize` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    pub audio_content: String,
}

/// Body of a `voices` response.
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<ApiVoice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVoice {
    pub name: String,
    #[serde(default)]
    pub language_codes: Vec<String>,
    #[serde(default)]
    pub ssml_gender: Option<String>,
    #[serde(default)]
    pub natural_sample_rate_hertz: Option<u32>,
}

/// Error envelope the service wraps failures in.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Pull the service's error message out of a failure body, best effort.
pub fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
}

/// Wrap sentence text in an SSML document, escaping markup characters.
pub fn ssml_document(text: &str) -> String {
    format!("<speak>{}</speak>", escape_xml(text))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
