//! Transcript acquisition and playback synchronization for episode previews.
//!
//! Selecting a [`MediaSource`] on the [`SyncController`] streams the annotated
//! transcript from the transcription service (falling back to a one-shot
//! request), derives chapters from it, and keeps a [`SyncFrame`] in step with
//! the playback clock so a view can highlight the current segment and chapter.

pub mod chapters;
pub mod config;
#[cfg(feature = "logging")]
pub mod logging;
pub mod playback;
pub mod progress;
pub mod sync;
pub mod transcript;

pub use chapters::{Chapter, ChapterSummarizer, ChapterSynthesizer, SynthesisError};
pub use config::EngineConfig;
pub use playback::{MediaPlayer, MediaSource, PlaybackClock, PlaybackState};
pub use progress::{
    ConsumerState, FetchError, FetchProgress, HttpTranscriptionTransport, ProgressStreamConsumer,
    TranscriptionTransport, TransportError,
};
pub use sync::{SessionError, SyncController, SyncFrame, TranscriptStatus};
pub use transcript::TranscriptSegment;
