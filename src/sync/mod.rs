// sync/mod.rs - Synchronization Controller and frame projection

mod controller;
mod projection;

pub use controller::{SessionError, SyncController};
pub use projection::{active_chapters, highlighted_segments, project, SyncFrame};

use serde::Serialize;

/// Outcome of transcript acquisition for the live session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum TranscriptStatus {
    #[default]
    Pending,
    Ready,
    /// Acquisition succeeded but produced no segments
    NoTranscript,
    /// Both the stream and the one-shot fallback failed
    Failed(String),
}

impl TranscriptStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
