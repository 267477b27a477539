use serde::Serialize;
use std::fmt;

/// Consumer lifecycle.
///
/// `Idle -> Initializing -> Streaming -> {Completed | Errored}` and, on error,
/// `Errored -> FallbackRequesting -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Idle,
    Initializing,
    Streaming,
    Completed,
    Errored,
    FallbackRequesting,
    Failed,
}

impl ConsumerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConsumerState::Completed | ConsumerState::Failed)
    }
}

/// Inputs that drive [`ConsumerState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    StreamOpened,
    TranscriptReceived,
    StreamFailed,
    FallbackStarted,
    FallbackSucceeded,
    FallbackFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition {on:?} from {from:?}")]
pub struct InvalidTransition {
    pub from: ConsumerState,
    pub on: Transition,
}

/// Transition table.
pub fn next_state(from: ConsumerState, on: Transition) -> Result<ConsumerState, InvalidTransition> {
    use ConsumerState::*;
    use Transition::*;

    let to = match (from, on) {
        (Idle | Completed | Failed, Start) => Initializing,
        (Initializing, StreamOpened) => Streaming,
        (Initializing | Streaming, StreamFailed) => Errored,
        (Streaming, TranscriptReceived) => Completed,
        (Errored, FallbackStarted) => FallbackRequesting,
        (FallbackRequesting, FallbackSucceeded) => Completed,
        (FallbackRequesting, FallbackFailed) => Failed,
        _ => return Err(InvalidTransition { from, on }),
    };

    Ok(to)
}

/// Observable fetch status, published at every step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub state: ConsumerState,
    pub loading: bool,
    pub progress_percent: u8,
    pub message: String,
    pub error: Option<String>,
}

impl Default for FetchProgress {
    fn default() -> Self {
        Self {
            state: ConsumerState::Idle,
            loading: false,
            progress_percent: 0,
            message: String::new(),
            error: None,
        }
    }
}

impl fmt::Display for FetchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{:?}: {}", self.state, error),
            None => write!(f, "{:?} {}% {}", self.state, self.progress_percent, self.message),
        }
    }
}
