use serde::{Deserialize, Serialize};

/// The playable audio item being transcribed and annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub audio_url: String,
    pub duration_ms: u64,
}

impl MediaSource {
    pub fn new(audio_url: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            audio_url: audio_url.into(),
            duration_ms,
        }
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Handle to the audio element that actually renders the Media Source.
///
/// Injected into the playback clock so it can run against a fake player.
pub trait MediaPlayer: Send + Sync {
    /// Live playback position in seconds
    fn position_sec(&self) -> f64;

    /// Move the playback position
    fn set_position_sec(&self, position_sec: f64);

    fn play(&self);

    fn pause(&self);
}
