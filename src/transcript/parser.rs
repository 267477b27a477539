use super::TranscriptSegment;

const RECORD_DELIMITER: &str = ". ";
const FIELD_DELIMITER: char = ';';
const MIN_FIELDS: usize = 3;

/// Parse an annotated transcript into timed segments.
///
/// Records are separated by `". "` and the unterminated tail after the last
/// delimiter is discarded. Each record holds `label value` fields split by
/// `;` (start, end, text). Malformed records are skipped; output keeps input
/// order and never assumes the times are monotonic.
pub fn parse(raw: &str) -> Vec<TranscriptSegment> {
    let mut records: Vec<&str> = raw.split(RECORD_DELIMITER).collect();
    records.pop();

    let mut segments = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        match parse_record(record) {
            Some(segment) => segments.push(segment),
            None => {
                skipped += 1;
                tracing::debug!("Skipping malformed transcript record: {:?}", record);
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            "Transcript parse skipped {} malformed record(s), kept {}",
            skipped,
            segments.len()
        );
    }

    segments
}

fn parse_record(record: &str) -> Option<TranscriptSegment> {
    // Only the third field is text; anything after a further `;` is dropped.
    let fields: Vec<&str> = record.split(FIELD_DELIMITER).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let start_time_sec = parse_seconds(field_value(fields[0]))?;
    let end_time_sec = parse_seconds(field_value(fields[1]))?;
    let text = field_value(fields[2]).trim();

    if text.is_empty() || end_time_sec < start_time_sec {
        return None;
    }

    Some(TranscriptSegment {
        start_time_sec,
        end_time_sec,
        text: text.to_string(),
    })
}

/// Strip the label token: the value is everything after the first space.
fn field_value(field: &str) -> &str {
    match field.split_once(' ') {
        Some((_, value)) => value,
        None => field,
    }
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}
