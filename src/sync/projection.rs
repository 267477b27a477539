use super::TranscriptStatus;
use crate::chapters::Chapter;
use crate::playback::PlaybackState;
use crate::transcript::TranscriptSegment;
use serde::Serialize;

/// What the view should show at one instant of playback.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFrame {
    pub current_time_sec: f64,
    pub is_playing: bool,
    /// Last chapter whose range contains the current time
    pub active_chapter_index: Option<usize>,
    /// Every chapter whose range contains the current time (overlaps are kept)
    pub active_chapters: Vec<usize>,
    /// Last segment whose interval contains the current time
    pub highlighted_segment_index: Option<usize>,
    pub highlighted_segments: Vec<usize>,
    pub segment_count: usize,
    pub chapter_count: usize,
    /// Acquisition outcome; the projection itself leaves this `Pending`
    pub transcript: TranscriptStatus,
}

impl SyncFrame {
    pub fn is_chapter_active(&self, index: usize) -> bool {
        self.active_chapters.contains(&index)
    }
}

/// Pure projection of `(segments, chapters, playback)` into a frame.
pub fn project(segments: &[TranscriptSegment], chapters: &[Chapter], playback: PlaybackState) -> SyncFrame {
    let time = playback.current_time_sec;
    let active_chapters = active_chapters(chapters, time);
    let highlighted_segments = highlighted_segments(segments, time);

    SyncFrame {
        current_time_sec: time,
        is_playing: playback.is_playing,
        active_chapter_index: active_chapters.last().copied(),
        active_chapters,
        highlighted_segment_index: highlighted_segments.last().copied(),
        highlighted_segments,
        segment_count: segments.len(),
        chapter_count: chapters.len(),
        transcript: TranscriptStatus::default(),
    }
}

/// Indices of chapters with `start <= time < end`, in stored order.
pub fn active_chapters(chapters: &[Chapter], time_sec: f64) -> Vec<usize> {
    chapters
        .iter()
        .enumerate()
        .filter(|(_, chapter)| chapter.contains(time_sec))
        .map(|(idx, _)| idx)
        .collect()
}

/// Indices of segments with `start <= time < end`, in stored order.
pub fn highlighted_segments(segments: &[TranscriptSegment], time_sec: f64) -> Vec<usize> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.contains(time_sec))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(start_ms: u64, end_ms: u64) -> Chapter {
        Chapter {
            title: format!("{}-{}", start_ms, end_ms),
            start_time_ms: start_ms,
            end_time_ms: end_ms,
        }
    }

    fn segment(start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            start_time_sec: start,
            end_time_sec: end,
            text: "words".to_string(),
        }
    }

    fn at(time: f64) -> PlaybackState {
        PlaybackState {
            current_time_sec: time,
            is_playing: true,
        }
    }

    #[test]
    fn test_chapter_boundary_is_half_open() {
        let chapters = vec![chapter(0, 15_000), chapter(15_000, 30_000)];
        let frame = project(&[], &chapters, at(15.0));
        assert_eq!(frame.active_chapters, vec![1]);
        assert_eq!(frame.active_chapter_index, Some(1));
        assert!(!frame.is_chapter_active(0));
    }

    #[test]
    fn test_overlapping_chapters_are_all_active() {
        let chapters = vec![chapter(0, 20_000), chapter(10_000, 30_000)];
        let frame = project(&[], &chapters, at(12.0));
        assert_eq!(frame.active_chapters, vec![0, 1]);
        assert_eq!(frame.active_chapter_index, Some(1));
    }

    #[test]
    fn test_highlight_last_match_or_none() {
        let segments = vec![segment(0.0, 4.0), segment(3.0, 6.0), segment(8.0, 9.0)];

        let frame = project(&segments, &[], at(3.5));
        assert_eq!(frame.highlighted_segments, vec![0, 1]);
        assert_eq!(frame.highlighted_segment_index, Some(1));

        let gap = project(&segments, &[], at(7.0));
        assert_eq!(gap.highlighted_segment_index, None);
        assert!(gap.highlighted_segments.is_empty());

        let end = project(&segments, &[], at(9.0));
        assert_eq!(end.highlighted_segment_index, None);
    }

    #[test]
    fn test_counts_and_play_state() {
        let frame = project(&[segment(0.0, 1.0)], &[chapter(0, 30_000)], PlaybackState::default());
        assert_eq!(frame.segment_count, 1);
        assert_eq!(frame.chapter_count, 1);
        assert!(!frame.is_playing);
        assert_eq!(frame.active_chapter_index, Some(0));
    }
}
