// transcript/types.rs - Transcript segment types

use serde::{Deserialize, Serialize};

/// A time-bounded span of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Start of the span in seconds
    pub start_time_sec: f64,
    /// End of the span in seconds (never before start)
    pub end_time_sec: f64,
    /// Spoken text, never empty
    pub text: String,
}

impl TranscriptSegment {
    /// Half-open containment: `[start, end)`.
    pub fn contains(&self, time_sec: f64) -> bool {
        time_sec >= self.start_time_sec && time_sec < self.end_time_sec
    }

    pub fn duration_sec(&self) -> f64 {
        self.end_time_sec - self.start_time_sec
    }
}

/// Wire shape the chapter summarizer receives for each segment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPayload<'a> {
    pub start_time: f64,
    pub end_time: f64,
    pub sentence: &'a str,
}

impl<'a> From<&'a TranscriptSegment> for SegmentPayload<'a> {
    fn from(segment: &'a TranscriptSegment) -> Self {
        Self {
            start_time: segment.start_time_sec,
            end_time: segment.end_time_sec,
            sentence: &segment.text,
        }
    }
}
