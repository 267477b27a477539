// chapters/types.rs - Chapter types and error definitions

use serde::{Deserialize, Serialize};

/// A named time range grouping transcript segments.
///
/// Whether a chapter is active is not stored here; it is projected from the
/// playback time on every tick (see `sync::project`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

impl Chapter {
    pub fn start_sec(&self) -> f64 {
        self.start_time_ms as f64 / 1000.0
    }

    pub fn end_sec(&self) -> f64 {
        self.end_time_ms as f64 / 1000.0
    }

    /// Half-open containment: `[start, end)`.
    pub fn contains(&self, time_sec: f64) -> bool {
        time_sec >= self.start_sec() && time_sec < self.end_sec()
    }
}

/// One entry of the summarization service's JSON array. The service also
/// sends an `active` flag, which is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct ChapterProposal {
    pub title: String,
    pub time: [f64; 2],
}

impl ChapterProposal {
    /// Convert to a chapter, rejecting blank titles and empty or negative ranges.
    pub fn into_chapter(self) -> Option<Chapter> {
        let title = self.title.trim();
        let [start, end] = self.time;
        if title.is_empty() || !start.is_finite() || !end.is_finite() || start < 0.0 {
            return None;
        }

        let start_time_ms = start.round() as u64;
        let end_time_ms = end.round() as u64;
        if end_time_ms <= start_time_ms {
            return None;
        }

        Some(Chapter {
            title: title.to_string(),
            start_time_ms,
            end_time_ms,
        })
    }
}

/// Chapter synthesis errors. Never surfaced to the listener; every variant
/// degrades to the deterministic fallback.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid chapter response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Chapter summarizer not configured")]
    NotConfigured,
}
