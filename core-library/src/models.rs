//! Domain models for sentence playlists
//!
//! A playlist is an ordered list of [`Track`]s: one spoken sentence with its
//! translation shown alongside. Tracks carry no stable identity; replacing
//! the playlist replaces them wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One sentence pair in a playlist.
///
/// `duration_seconds` starts empty and is filled in once the first network
/// playback measures the real clip duration (always at 1.0x speed). The
/// serialized field names match the two-column import format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Sentence that is spoken aloud.
    #[serde(rename = "english")]
    pub text: String,

    /// Translation shown alongside; never spoken.
    #[serde(rename = "korean")]
    pub translation: String,

    /// Measured playback duration at 1.0x speed, when known.
    #[serde(
        rename = "duration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f64>,
}

impl Track {
    pub fn new(text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
            duration_seconds: None,
        }
    }

    /// Record the measured clip duration. Overwrites any earlier estimate;
    /// measured values always win.
    pub fn set_measured_duration(&mut self, seconds: f64) {
        self.duration_seconds = Some(seconds);
    }

    /// Length of the spoken text in characters. Progress fractions and the
    /// speech-backend duration estimate are both computed against this.
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration_seconds {
            Some(d) => write!(f, "{} ({})", self.text, format_duration_secs(d)),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Format a duration the way playlists display it ("3.42s").
pub fn format_duration_secs(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00.00s".to_string();
    }
    format!("{:.2}s", seconds)
}

/// Built-in sample playlist for demos and first-run sessions.
pub fn sample_tracks() -> Vec<Track> {
    [
        (
            "So, today was our quarterly wrap-up meeting.",
            "오늘은 분기 총괄회의가 있었어요.",
        ),
        (
            "We reviewed all the major projects from Q4.",
            "우리는 4분기의 모든 주요 프로젝트를 검토했습니다.",
        ),
        (
            "The presentation was really well organized.",
            "발표는 정말 잘 구성되어 있었어요.",
        ),
        (
            "I think we exceeded our targets this quarter.",
            "이번 분기에 목표를 초과 달성한 것 같아요.",
        ),
        (
            "The team collaboration has been outstanding.",
            "팀 협업이 정말 훌륭했습니다.",
        ),
        (
            "We need to improve our communication channels.",
            "우리는 커뮤니케이션 채널을 개선해야 합니다.",
        ),
        (
            "The client feedback was overwhelmingly positive.",
            "고객 피드백은 압도적으로 긍정적이었습니다.",
        ),
        (
            "Let's celebrate our achievements together.",
            "함께 우리의 성과를 축하합시다.",
        ),
        (
            "Next quarter looks very promising.",
            "다음 분기는 매우 유망해 보입니다.",
        ),
        (
            "Thank you all for your hard work.",
            "모두 수고하셨습니다.",
        ),
    ]
    .into_iter()
    .map(|(text, translation)| Track::new(text, translation))
    .collect()
}
