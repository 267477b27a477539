use super::TranscriptSegment;

/// Indices of segments whose text contains `query`, ignoring case.
pub fn search(segments: &[TranscriptSegment], query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.text.to_lowercase().contains(&needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// Render seconds as `m:ss`, or `h:m:ss` past the hour.
pub fn format_timestamp(time_sec: f64) -> String {
    if !time_sec.is_finite() || time_sec <= 0.0 {
        return "0:00".to_string();
    }

    let total = time_sec.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
