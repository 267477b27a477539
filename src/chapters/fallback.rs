use super::Chapter;
use crate::transcript::TranscriptSegment;

/// Fixed preview window every synthesized chapter list covers.
pub const PREVIEW_WINDOW_MS: u64 = 30_000;
const MAX_CHAPTERS: usize = 3;
const SEGMENTS_PER_CHAPTER: usize = 5;
const FULL_EPISODE_TITLE: &str = "Full Episode";

/// Deterministic, network-free chapter list.
///
/// No segments yields a single "Full Episode" chapter. Otherwise the window
/// is cut into `min(3, ceil(n / 5))` equal contiguous slices.
pub fn synthesize(segments: &[TranscriptSegment]) -> Vec<Chapter> {
    if segments.is_empty() {
        return vec![Chapter {
            title: FULL_EPISODE_TITLE.to_string(),
            start_time_ms: 0,
            end_time_ms: PREVIEW_WINDOW_MS,
        }];
    }

    let count = segments
        .len()
        .div_ceil(SEGMENTS_PER_CHAPTER)
        .clamp(1, MAX_CHAPTERS) as u64;

    (0..count)
        .map(|idx| Chapter {
            title: format!("Chapter {}", idx + 1),
            start_time_ms: idx * PREVIEW_WINDOW_MS / count,
            end_time_ms: (idx + 1) * PREVIEW_WINDOW_MS / count,
        })
        .collect()
}
