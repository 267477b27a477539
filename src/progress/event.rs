// progress/event.rs - Progress event frames and line framing

use serde::Deserialize;

const FRAME_PREFIX: &str = "data: ";
const DEFAULT_ERROR_MESSAGE: &str = "Transcription failed";

/// One incremental status update from the transcription backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Progress { percent: u8, message: String },
    Completed { raw_transcript: String },
    Error { message: String },
}

/// A `data: ` frame whose payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Invalid frame JSON: {0}")]
    Json(String),
}

#[derive(Deserialize)]
struct RawFrame {
    status: String,
    progress: Option<f64>,
    message: Option<String>,
    transcript: Option<String>,
    error: Option<String>,
}

impl From<RawFrame> for ProgressEvent {
    fn from(frame: RawFrame) -> Self {
        let transcript = frame.transcript.filter(|t| !t.trim().is_empty());
        match frame.status.as_str() {
            "error" => ProgressEvent::Error {
                message: frame
                    .error
                    .or(frame.message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            },
            "completed" if transcript.is_some() => ProgressEvent::Completed {
                raw_transcript: transcript.unwrap_or_default(),
            },
            // downloading, converting, analyzing, transcribing, saving, and a
            // completed frame whose transcript is missing or empty
            _ => ProgressEvent::Progress {
                percent: clamp_percent(frame.progress),
                message: frame.message.unwrap_or_default(),
            },
        }
    }
}

fn clamp_percent(progress: Option<f64>) -> u8 {
    match progress {
        Some(value) if value.is_finite() => value.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// Decode one line of the stream. Lines without the `data: ` prefix are not
/// frames and yield `None`.
pub fn decode_frame(line: &str) -> Option<Result<ProgressEvent, FrameError>> {
    let payload = line.strip_prefix(FRAME_PREFIX)?;
    Some(
        serde_json::from_str::<RawFrame>(payload)
            .map(ProgressEvent::from)
            .map_err(|e| FrameError::Json(e.to_string())),
    )
}

/// Reassembles lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and drain every complete line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// Flush an unterminated final line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
