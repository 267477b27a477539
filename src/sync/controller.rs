use super::projection::{project, SyncFrame};
use super::TranscriptStatus;
use crate::chapters::{Chapter, ChapterSynthesizer};
use crate::config::EngineConfig;
use crate::playback::{MediaPlayer, MediaSource, PlaybackClock, PlaybackState};
use crate::progress::{FetchProgress, HttpTranscriptionTransport, ProgressStreamConsumer, TranscriptionTransport};
use crate::transcript::{self, TranscriptSegment};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Chapter {0} out of range")]
    ChapterOutOfRange(usize),

    #[error("Segment {0} out of range")]
    SegmentOutOfRange(usize),

    #[error("Transcript acquisition has not failed")]
    NothingToRetry,
}

/// Identifies one acquisition attempt; writes carrying a stale ticket are dropped.
#[derive(Debug, Clone)]
struct FetchTicket {
    session_id: String,
    generation: u64,
}

/// Everything that belongs to one selected Media Source.
struct Session {
    id: String,
    source: MediaSource,
    clock: Arc<PlaybackClock>,
    segments: Arc<Vec<TranscriptSegment>>,
    chapters: Arc<Vec<Chapter>>,
    transcript: TranscriptStatus,
    progress: watch::Receiver<FetchProgress>,
    fetch_generation: u64,
    fetch_task: Option<JoinHandle<()>>,
    sync_task: Option<JoinHandle<()>>,
}

impl Session {
    fn frame(&self) -> SyncFrame {
        SyncFrame {
            transcript: self.transcript.clone(),
            ..project(&self.segments, &self.chapters, self.clock.state())
        }
    }

    fn ticket(&self) -> FetchTicket {
        FetchTicket {
            session_id: self.id.clone(),
            generation: self.fetch_generation,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.sync_task.take() {
            handle.abort();
        }
        self.clock.pause();
        tracing::info!("Session {} closed", self.id);
    }
}

struct ControllerInner {
    transport: Arc<dyn TranscriptionTransport>,
    chapters: ChapterSynthesizer,
    read_timeout: Duration,
    session: Mutex<Option<Session>>,
    frames: watch::Sender<SyncFrame>,
}

impl ControllerInner {
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` only if `ticket` still names the live acquisition, then
    /// republish the frame.
    fn apply<R>(&self, ticket: &FetchTicket, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.lock();
        let session = guard
            .as_mut()
            .filter(|s| s.id == ticket.session_id && s.fetch_generation == ticket.generation)?;
        let result = f(session);
        self.frames.send_replace(session.frame());
        Some(result)
    }

    /// Recompute the frame for the live session, if `session_id` is still live.
    fn refresh(&self, session_id: Option<&str>) {
        let guard = self.lock();
        if let Some(session) = guard.as_ref() {
            if session_id.map_or(true, |id| id == session.id) {
                self.frames.send_replace(session.frame());
            }
        }
    }
}

/// Synchronization Controller.
///
/// Owns the episode session: starts transcript acquisition when a Media
/// Source is selected, starts chapter synthesis once segments exist, and
/// republishes a [`SyncFrame`] whenever time, segments or chapters change.
/// Selecting a new source tears the previous session down first.
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

impl SyncController {
    pub fn new(
        transport: Arc<dyn TranscriptionTransport>,
        chapters: ChapterSynthesizer,
        read_timeout: Duration,
    ) -> Self {
        let (frames, _) = watch::channel(SyncFrame::default());
        Self {
            inner: Arc::new(ControllerInner {
                transport,
                chapters,
                read_timeout,
                session: Mutex::new(None),
                frames,
            }),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Arc::new(HttpTranscriptionTransport::from_config(config)),
            ChapterSynthesizer::from_config(config),
            config.stream_timeout(),
        )
    }

    /// Start a fresh session for `source`. Must run inside a tokio runtime.
    pub fn select_source(&self, source: MediaSource, player: Arc<dyn MediaPlayer>) -> String {
        // Held until the new session is installed, so a fast fetch task
        // blocks in `apply` instead of finding an empty slot.
        let mut guard = self.inner.lock();
        let previous = guard.take();

        let id = Uuid::new_v4().to_string();
        let clock = Arc::new(PlaybackClock::new(&source, player));
        let sync_task = spawn_sync(self.inner.clone(), id.clone(), clock.subscribe());
        let ticket = FetchTicket {
            session_id: id.clone(),
            generation: 0,
        };
        let (progress, fetch_task) = start_fetch(&self.inner, ticket, source.audio_url.clone());

        tracing::info!(
            "Started session {} for {} ({} ms)",
            id,
            source.audio_url,
            source.duration_ms
        );

        let session = Session {
            id: id.clone(),
            source,
            clock,
            segments: Arc::new(Vec::new()),
            chapters: Arc::new(Vec::new()),
            transcript: TranscriptStatus::Pending,
            progress,
            fetch_generation: 0,
            fetch_task: Some(fetch_task),
            sync_task: Some(sync_task),
        };
        self.inner.frames.send_replace(session.frame());
        *guard = Some(session);
        drop(guard);
        drop(previous);

        id
    }

    /// End the current session: stop the stream read and the playback tick.
    pub fn close(&self) {
        let session = self.inner.lock().take();
        if session.is_some() {
            drop(session);
            self.inner.frames.send_replace(SyncFrame::default());
        }
    }

    /// Restart acquisition after a hard failure.
    pub fn retry(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock();
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        if !session.transcript.is_failed() {
            return Err(SessionError::NothingToRetry);
        }

        if let Some(handle) = session.fetch_task.take() {
            handle.abort();
        }
        session.fetch_generation += 1;
        session.transcript = TranscriptStatus::Pending;

        let (progress, fetch_task) =
            start_fetch(&self.inner, session.ticket(), session.source.audio_url.clone());
        session.progress = progress;
        session.fetch_task = Some(fetch_task);

        tracing::info!("Retrying transcript for session {}", session.id);
        self.inner.frames.send_replace(session.frame());
        Ok(())
    }

    pub fn play(&self) -> Result<(), SessionError> {
        self.clock()?.play();
        self.inner.refresh(None);
        Ok(())
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.clock()?.pause();
        self.inner.refresh(None);
        Ok(())
    }

    /// Flip play/pause; returns whether playback is now running.
    pub fn toggle_play(&self) -> Result<bool, SessionError> {
        let clock = self.clock()?;
        if clock.state().is_playing {
            clock.pause();
        } else {
            clock.play();
        }
        self.inner.refresh(None);
        Ok(clock.state().is_playing)
    }

    /// Seek within the current source; returns the clamped position.
    pub fn seek(&self, target_sec: f64) -> Result<f64, SessionError> {
        let position = self.clock()?.seek(target_sec);
        self.inner.refresh(None);
        Ok(position)
    }

    pub fn seek_to_chapter(&self, index: usize) -> Result<f64, SessionError> {
        let start = self
            .chapters()
            .get(index)
            .map(Chapter::start_sec)
            .ok_or(SessionError::ChapterOutOfRange(index))?;
        self.seek(start)
    }

    pub fn seek_to_segment(&self, index: usize) -> Result<f64, SessionError> {
        let start = self
            .segments()
            .get(index)
            .map(|segment| segment.start_time_sec)
            .ok_or(SessionError::SegmentOutOfRange(index))?;
        self.seek(start)
    }

    /// Current frame, projected on demand.
    pub fn frame(&self) -> SyncFrame {
        self.inner
            .lock()
            .as_ref()
            .map(Session::frame)
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncFrame> {
        self.inner.frames.subscribe()
    }

    pub fn playback(&self) -> Option<PlaybackState> {
        self.inner.lock().as_ref().map(|s| s.clock.state())
    }

    pub fn fetch_progress(&self) -> Option<FetchProgress> {
        self.inner
            .lock()
            .as_ref()
            .map(|s| s.progress.borrow().clone())
    }

    /// Progress of the current acquisition; a retry replaces the channel.
    pub fn subscribe_progress(&self) -> Option<watch::Receiver<FetchProgress>> {
        self.inner.lock().as_ref().map(|s| s.progress.clone())
    }

    pub fn transcript_status(&self) -> Option<TranscriptStatus> {
        self.inner.lock().as_ref().map(|s| s.transcript.clone())
    }

    pub fn segments(&self) -> Arc<Vec<TranscriptSegment>> {
        self.inner
            .lock()
            .as_ref()
            .map(|s| s.segments.clone())
            .unwrap_or_default()
    }

    pub fn chapters(&self) -> Arc<Vec<Chapter>> {
        self.inner
            .lock()
            .as_ref()
            .map(|s| s.chapters.clone())
            .unwrap_or_default()
    }

    /// Indices of segments mentioning `query`.
    pub fn search(&self, query: &str) -> Vec<usize> {
        transcript::search(&self.segments(), query)
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().as_ref().map(|s| s.id.clone())
    }

    pub fn source(&self) -> Option<MediaSource> {
        self.inner.lock().as_ref().map(|s| s.source.clone())
    }

    fn clock(&self) -> Result<Arc<PlaybackClock>, SessionError> {
        self.inner
            .lock()
            .as_ref()
            .map(|s| s.clock.clone())
            .ok_or(SessionError::NoActiveSession)
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        let session = self.inner.lock().take();
        drop(session);
    }
}

fn spawn_sync(
    inner: Arc<ControllerInner>,
    session_id: String,
    mut playback: watch::Receiver<PlaybackState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while playback.changed().await.is_ok() {
            inner.refresh(Some(session_id.as_str()));
        }
    })
}

fn start_fetch(
    inner: &Arc<ControllerInner>,
    ticket: FetchTicket,
    audio_url: String,
) -> (watch::Receiver<FetchProgress>, JoinHandle<()>) {
    let consumer = ProgressStreamConsumer::new(inner.transport.clone(), inner.read_timeout);
    let progress = consumer.subscribe();
    let handle = tokio::spawn(acquire(inner.clone(), ticket, audio_url, consumer));
    (progress, handle)
}

async fn acquire(
    inner: Arc<ControllerInner>,
    ticket: FetchTicket,
    audio_url: String,
    mut consumer: ProgressStreamConsumer,
) {
    let segments = match consumer.run(&audio_url).await {
        Ok(segments) => Arc::new(segments),
        Err(e) => {
            let message = e.to_string();
            if inner
                .apply(&ticket, |s| s.transcript = TranscriptStatus::Failed(message))
                .is_none()
            {
                tracing::debug!("Dropping failure from superseded session {}", ticket.session_id);
            }
            return;
        }
    };

    let status = if segments.is_empty() {
        tracing::warn!("No transcript available for {}", audio_url);
        TranscriptStatus::NoTranscript
    } else {
        TranscriptStatus::Ready
    };

    let installed = inner.apply(&ticket, |s| {
        s.segments = segments.clone();
        s.transcript = status;
    });
    if installed.is_none() {
        tracing::debug!("Dropping transcript from superseded session {}", ticket.session_id);
        return;
    }

    let chapters = inner.chapters.synthesize(&segments).await;
    if inner
        .apply(&ticket, |s| s.chapters = Arc::new(chapters))
        .is_none()
    {
        tracing::debug!("Dropping chapters from superseded session {}", ticket.session_id);
    }
}
