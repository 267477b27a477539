// progress/mod.rs - Progress Stream Consumer
//
// Streams an incremental transcription job, and on any stream failure falls
// back to a single one-shot transcript request.

mod event;
mod state;
mod transport;

pub use event::{decode_frame, FrameError, LineBuffer, ProgressEvent};
pub use state::{next_state, ConsumerState, FetchProgress, InvalidTransition, Transition};
pub use transport::{ByteStream, HttpTranscriptionTransport, TranscriptionTransport, TransportError};

use crate::transcript::{self, TranscriptSegment};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const INITIALIZING_MESSAGE: &str = "Initializing...";
const FALLBACK_MESSAGE: &str = "Retrying with direct transcription...";
const COMPLETED_MESSAGE: &str = "Transcription completed!";

/// Why the stream path gave up.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Both the stream and the one-shot fallback failed.
    #[error("{stream}")]
    Failed { stream: String, fallback: String },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub struct ProgressStreamConsumer {
    transport: Arc<dyn TranscriptionTransport>,
    read_timeout: Duration,
    state: ConsumerState,
    progress: watch::Sender<FetchProgress>,
}

impl ProgressStreamConsumer {
    pub fn new(transport: Arc<dyn TranscriptionTransport>, read_timeout: Duration) -> Self {
        let (progress, _) = watch::channel(FetchProgress::default());
        Self {
            transport,
            read_timeout,
            state: ConsumerState::Idle,
            progress,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchProgress> {
        self.progress.subscribe()
    }

    /// Acquire and parse the transcript for `audio_url`.
    ///
    /// Only the combination "stream failed and fallback failed" is an error.
    /// An empty `Vec` means no transcript is available.
    pub async fn run(&mut self, audio_url: &str) -> Result<Vec<TranscriptSegment>, FetchError> {
        self.advance(Transition::Start)?;
        self.progress.send_modify(|p| {
            p.loading = true;
            p.progress_percent = 0;
            p.message = INITIALIZING_MESSAGE.to_string();
            p.error = None;
        });

        let stream_error = match self.stream(audio_url).await {
            Ok(segments) => {
                self.advance(Transition::TranscriptReceived)?;
                self.finish_ok(segments.len());
                return Ok(segments);
            }
            Err(e) => e,
        };

        tracing::warn!(
            "Progress stream via '{}' failed: {}, trying one-shot transcript",
            self.transport.name(),
            stream_error
        );
        self.advance(Transition::StreamFailed)?;
        self.advance(Transition::FallbackStarted)?;
        self.progress.send_modify(|p| {
            p.message = FALLBACK_MESSAGE.to_string();
        });

        let fallback = match timeout(self.read_timeout, self.transport.fetch_transcript(audio_url)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::TimeoutError),
        };

        match fallback {
            Ok(raw) => {
                let segments = transcript::parse(&raw);
                self.advance(Transition::FallbackSucceeded)?;
                self.finish_ok(segments.len());
                Ok(segments)
            }
            Err(fallback_error) => {
                self.advance(Transition::FallbackFailed)?;
                let message = stream_error.to_string();
                tracing::error!(
                    "Transcript unavailable: stream failed ({}), fallback failed ({})",
                    message,
                    fallback_error
                );
                self.progress.send_modify(|p| {
                    p.loading = false;
                    p.error = Some(message.clone());
                });
                Err(FetchError::Failed {
                    stream: message,
                    fallback: fallback_error.to_string(),
                })
            }
        }
    }

    async fn stream(&mut self, audio_url: &str) -> Result<Vec<TranscriptSegment>, StreamError> {
        let mut bytes = timeout(self.read_timeout, self.transport.open_progress_stream(audio_url))
            .await
            .map_err(|_| TransportError::TimeoutError)??;

        self.advance(Transition::StreamOpened)
            .map_err(|e| StreamError::Upstream(e.to_string()))?;

        let mut lines = LineBuffer::default();
        loop {
            let next = timeout(self.read_timeout, bytes.next())
                .await
                .map_err(|_| TransportError::TimeoutError)?;

            let (batch, ended) = match next {
                Some(chunk) => (lines.push(&chunk?), false),
                None => (lines.finish().into_iter().collect::<Vec<_>>(), true),
            };

            for line in batch {
                if let Some(segments) = self.handle_line(&line)? {
                    return Ok(segments);
                }
            }

            if ended {
                return Err(TransportError::EndOfStream.into());
            }
        }
    }

    /// `Some(segments)` once the transcript arrives; the read loop stops there.
    fn handle_line(&self, line: &str) -> Result<Option<Vec<TranscriptSegment>>, StreamError> {
        let event = match decode_frame(line) {
            None => return Ok(None),
            Some(Err(e)) => {
                tracing::warn!("Skipping progress frame: {}", e);
                return Ok(None);
            }
            Some(Ok(event)) => event,
        };

        match event {
            ProgressEvent::Progress { percent, message } => {
                tracing::debug!("Transcription progress {}%: {}", percent, message);
                self.progress.send_modify(|p| {
                    p.progress_percent = percent;
                    p.message = message;
                });
                Ok(None)
            }
            ProgressEvent::Error { message } => Err(StreamError::Upstream(message)),
            ProgressEvent::Completed { raw_transcript } => Ok(Some(transcript::parse(&raw_transcript))),
        }
    }

    fn advance(&mut self, on: Transition) -> Result<(), InvalidTransition> {
        let next = next_state(self.state, on)?;
        tracing::debug!("Progress consumer {:?} -> {:?}", self.state, next);
        self.state = next;
        self.progress.send_modify(|p| p.state = next);
        Ok(())
    }

    fn finish_ok(&self, segment_count: usize) {
        tracing::info!("Transcript ready: {} segments", segment_count);
        self.progress.send_modify(|p| {
            p.loading = false;
            p.progress_percent = 100;
            p.message = COMPLETED_MESSAGE.to_string();
            p.error = None;
        });
    }
}
