use async_trait::async_trait;
use episode_sync::progress::ByteStream;
use episode_sync::{
    ChapterSummarizer, ChapterSynthesizer, ConsumerState, MediaPlayer, MediaSource, SyncController,
    SynthesisError, TranscriptSegment, TranscriptStatus, TranscriptionTransport, TransportError,
};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const FIRST_URL: &str = "https://cdn.example.com/first.mp3";
const SECOND_URL: &str = "https://cdn.example.com/second.mp3";

const FIRST_TRANSCRIPT: &str = "startTime: 0;endTime: 4;sentence: First episode opening. \
    startTime: 4;endTime: 9;sentence: First episode body. ";

const SECOND_TRANSCRIPT: &str = "startTime: 0;endTime: 6;sentence: Welcome back. \
    startTime: 6;endTime: 15;sentence: Today we cover lifetimes. \
    startTime: 15;endTime: 28;sentence: And then async runtimes. ";

/// Transport whose progress streams are fed by the test through channels.
#[derive(Default)]
struct ChannelTransport {
    streams: Mutex<HashMap<String, mpsc::UnboundedReceiver<Vec<u8>>>>,
    transcripts: Mutex<HashMap<String, String>>,
}

impl ChannelTransport {
    fn feed(&self, audio_url: &str) -> mpsc::UnboundedSender<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().insert(audio_url.to_string(), rx);
        tx
    }

    fn one_shot(&self, audio_url: &str, raw: &str) {
        self.transcripts
            .lock()
            .unwrap()
            .insert(audio_url.to_string(), raw.to_string());
    }
}

#[async_trait]
impl TranscriptionTransport for ChannelTransport {
    async fn open_progress_stream(&self, audio_url: &str) -> Result<ByteStream, TransportError> {
        let rx = self
            .streams
            .lock()
            .unwrap()
            .remove(audio_url)
            .ok_or_else(|| TransportError::Http {
                status: 503,
                body: "progress stream unavailable".to_string(),
            })?;

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok(chunk), rx))
        });
        Ok(stream.boxed())
    }

    async fn fetch_transcript(&self, audio_url: &str) -> Result<String, TransportError> {
        self.transcripts
            .lock()
            .unwrap()
            .get(audio_url)
            .cloned()
            .ok_or_else(|| TransportError::NetworkError("connection reset".to_string()))
    }

    fn name(&self) -> &str {
        "channel"
    }
}

#[derive(Default)]
struct StubPlayer {
    position: Mutex<f64>,
}

impl MediaPlayer for StubPlayer {
    fn position_sec(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn set_position_sec(&self, position_sec: f64) {
        *self.position.lock().unwrap() = position_sec;
    }

    fn play(&self) {}

    fn pause(&self) {}
}

struct CannedSummarizer(&'static str);

#[async_trait]
impl ChapterSummarizer for CannedSummarizer {
    async fn summarize(&self, _segments: &[TranscriptSegment]) -> Result<String, SynthesisError> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

fn progress_frame(percent: u8) -> Vec<u8> {
    format!(
        "data: {}\n\n",
        serde_json::json!({"status": "processing", "progress": percent, "message": "Transcribing"})
    )
    .into_bytes()
}

fn completed_frame(raw: &str) -> Vec<u8> {
    format!(
        "data: {}\n\n",
        serde_json::json!({"status": "completed", "progress": 100, "transcript": raw})
    )
    .into_bytes()
}

fn controller(transport: Arc<ChannelTransport>, summarizer: Option<Arc<dyn ChapterSummarizer>>) -> SyncController {
    SyncController::new(
        transport,
        ChapterSynthesizer::new(summarizer, Duration::from_secs(5)),
        Duration::from_secs(5),
    )
}

fn texts(segments: &[TranscriptSegment]) -> Vec<String> {
    segments.iter().map(|s| s.text.clone()).collect()
}

#[tokio::test]
async fn switching_source_mid_stream_ignores_the_old_stream() {
    let transport = Arc::new(ChannelTransport::default());
    let first_feed = transport.feed(FIRST_URL);
    let second_feed = transport.feed(SECOND_URL);
    let controller = controller(transport.clone(), None);

    let first_id = controller.select_source(MediaSource::new(FIRST_URL, 10_000), Arc::new(StubPlayer::default()));
    first_feed.send(progress_frame(40)).unwrap();
    controller
        .subscribe_progress()
        .unwrap()
        .wait_for(|p| p.progress_percent == 40)
        .await
        .unwrap();

    let second_id = controller.select_source(MediaSource::new(SECOND_URL, 30_000), Arc::new(StubPlayer::default()));
    assert_ne!(first_id, second_id);

    // The first stream finishing late must not reach the new session.
    let _ = first_feed.send(completed_frame(FIRST_TRANSCRIPT));
    second_feed.send(progress_frame(80)).unwrap();
    second_feed.send(completed_frame(SECOND_TRANSCRIPT)).unwrap();

    let mut frames = controller.subscribe();
    frames.wait_for(|f| f.chapter_count > 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.session_id(), Some(second_id));
    assert_eq!(
        texts(&controller.segments()),
        vec!["Welcome back", "Today we cover lifetimes", "And then async runtimes"]
    );
    assert_eq!(controller.source().unwrap().audio_url, SECOND_URL);
    assert_eq!(controller.fetch_progress().unwrap().state, ConsumerState::Completed);
}

#[tokio::test]
async fn fallback_yields_the_same_segments_as_the_stream() {
    let transport = Arc::new(ChannelTransport::default());
    let feed = transport.feed(FIRST_URL);
    transport.one_shot(SECOND_URL, SECOND_TRANSCRIPT);
    let controller = controller(transport, None);
    let mut frames = controller.subscribe();

    controller.select_source(MediaSource::new(FIRST_URL, 30_000), Arc::new(StubPlayer::default()));
    feed.send(completed_frame(SECOND_TRANSCRIPT)).unwrap();
    frames.wait_for(|f| f.segment_count == 3).await.unwrap();
    let streamed = controller.segments();

    controller.select_source(MediaSource::new(SECOND_URL, 30_000), Arc::new(StubPlayer::default()));
    frames
        .wait_for(|f| f.segment_count == 3 && f.transcript == TranscriptStatus::Ready)
        .await
        .unwrap();
    let fetched = controller.segments();

    assert_eq!(*streamed, *fetched);
    let progress = controller.fetch_progress().unwrap();
    assert_eq!(progress.state, ConsumerState::Completed);
    assert!(progress.error.is_none());
}

#[tokio::test]
async fn chapter_boundary_activates_the_later_chapter() {
    let transport = Arc::new(ChannelTransport::default());
    transport.one_shot(SECOND_URL, SECOND_TRANSCRIPT);
    let summarizer: Arc<dyn ChapterSummarizer> = Arc::new(CannedSummarizer(
        r#"[{"title": "Warm up", "time": [0, 15000], "active": false},
            {"title": "Runtimes", "time": [15000, 30000], "active": false}]"#,
    ));
    let controller = controller(transport, Some(summarizer));
    let mut frames = controller.subscribe();

    controller.select_source(MediaSource::new(SECOND_URL, 30_000), Arc::new(StubPlayer::default()));
    frames.wait_for(|f| f.chapter_count == 2).await.unwrap();

    assert_eq!(controller.seek(15.0).unwrap(), 15.0);
    let frame = controller.frame();
    assert_eq!(frame.active_chapter_index, Some(1));
    assert!(!frame.is_chapter_active(0));
    assert_eq!(frame.highlighted_segment_index, Some(2));

    assert_eq!(controller.seek_to_chapter(0).unwrap(), 0.0);
    assert_eq!(controller.frame().active_chapter_index, Some(0));
    assert_eq!(controller.chapters()[1].title, "Runtimes");
}

#[tokio::test]
async fn both_paths_failing_reports_the_stream_error() {
    let transport = Arc::new(ChannelTransport::default());
    let controller = controller(transport.clone(), None);
    let mut frames = controller.subscribe();

    controller.select_source(MediaSource::new(FIRST_URL, 30_000), Arc::new(StubPlayer::default()));
    frames.wait_for(|f| f.transcript.is_failed()).await.unwrap();

    let progress = controller.fetch_progress().unwrap();
    assert!(!progress.loading);
    assert_eq!(progress.error.as_deref(), Some("HTTP 503: progress stream unavailable"));
    assert!(controller.chapters().is_empty());

    transport.one_shot(FIRST_URL, FIRST_TRANSCRIPT);
    controller.retry().unwrap();
    frames.wait_for(|f| f.chapter_count > 0).await.unwrap();
    assert_eq!(texts(&controller.segments()), vec!["First episode opening", "First episode body"]);
}
