// chapters/mod.rs - Chapter synthesis with deterministic fallback

pub mod fallback;
mod openai;
mod types;

pub use openai::OpenAiSummarizer;
pub use types::{Chapter, SynthesisError};

use crate::config::EngineConfig;
use crate::transcript::TranscriptSegment;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use types::ChapterProposal;

/// External service that proposes chapter boundaries for a transcript.
#[async_trait]
pub trait ChapterSummarizer: Send + Sync {
    /// Return the raw response text (expected to be a JSON array of chapters)
    async fn summarize(&self, segments: &[TranscriptSegment]) -> Result<String, SynthesisError>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Chapter Synthesizer client.
///
/// Asks the summarizer for chapters and validates the answer. Any failure
/// degrades to [`fallback::synthesize`], so `synthesize` never errors.
pub struct ChapterSynthesizer {
    summarizer: Option<Arc<dyn ChapterSummarizer>>,
    timeout: Duration,
}

impl ChapterSynthesizer {
    pub fn new(summarizer: Option<Arc<dyn ChapterSummarizer>>, timeout: Duration) -> Self {
        Self {
            summarizer,
            timeout,
        }
    }

    /// Build from config; without an API key only the fallback is used.
    pub fn from_config(config: &EngineConfig) -> Self {
        let timeout = config.chapter_timeout();
        let summarizer = config.chapter_api_key.clone().map(|key| {
            Arc::new(OpenAiSummarizer::new(
                config.chapter_api_url.clone(),
                key,
                config.chapter_model.clone(),
                timeout,
            )) as Arc<dyn ChapterSummarizer>
        });

        if summarizer.is_none() {
            tracing::warn!("Chapter API key missing, chapters will use the local fallback");
        }

        Self::new(summarizer, timeout)
    }

    pub async fn synthesize(&self, segments: &[TranscriptSegment]) -> Vec<Chapter> {
        if segments.len() <= 1 {
            tracing::debug!(
                "Skipping chapter summarization for {} segment(s)",
                segments.len()
            );
            return fallback::synthesize(segments);
        }

        match self.try_summarize(segments).await {
            Ok(chapters) => {
                tracing::info!("Chapter summarization succeeded: {} chapters", chapters.len());
                chapters
            }
            Err(e) => {
                tracing::warn!("Chapter summarization failed: {}, using fallback chapters", e);
                fallback::synthesize(segments)
            }
        }
    }

    async fn try_summarize(&self, segments: &[TranscriptSegment]) -> Result<Vec<Chapter>, SynthesisError> {
        let summarizer = self
            .summarizer
            .as_ref()
            .ok_or(SynthesisError::NotConfigured)?;

        tracing::info!(
            "Requesting chapters from '{}' for {} segments",
            summarizer.name(),
            segments.len()
        );

        let raw = match tokio::time::timeout(self.timeout, summarizer.summarize(segments)).await {
            Ok(result) => result?,
            Err(_) => return Err(SynthesisError::Timeout),
        };

        parse_chapters(&raw)
    }
}

/// Validate a summarizer response: a non-empty JSON array of
/// `{title, time: [startMs, endMs], active}` objects. Unusable entries are
/// dropped; if nothing usable remains the response is rejected.
pub fn parse_chapters(raw: &str) -> Result<Vec<Chapter>, SynthesisError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| SynthesisError::InvalidResponse(format!("not JSON: {}", e)))?;

    let entries = match value {
        serde_json::Value::Array(entries) if !entries.is_empty() => entries,
        serde_json::Value::Array(_) => {
            return Err(SynthesisError::InvalidResponse("empty array".to_string()))
        }
        _ => return Err(SynthesisError::InvalidResponse("not an array".to_string())),
    };

    let total = entries.len();
    let chapters: Vec<Chapter> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<ChapterProposal>(entry).ok())
        .filter_map(ChapterProposal::into_chapter)
        .collect();

    if chapters.is_empty() {
        return Err(SynthesisError::InvalidResponse(
            "no usable chapter entries".to_string(),
        ));
    }

    if chapters.len() < total {
        tracing::debug!("Dropped {} unusable chapter entries", total - chapters.len());
    }

    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSummarizer {
        reply: Result<String, ()>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeSummarizer {
        fn replying(body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(body.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChapterSummarizer for FakeSummarizer {
        async fn summarize(&self, _segments: &[TranscriptSegment]) -> Result<String, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply
                .clone()
                .map_err(|_| SynthesisError::NetworkError("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn segments(n: usize) -> Vec<TranscriptSegment> {
        (0..n)
            .map(|i| TranscriptSegment {
                start_time_sec: i as f64 * 2.0,
                end_time_sec: i as f64 * 2.0 + 2.0,
                text: format!("sentence {}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_uses_service_chapters() {
        let fake = FakeSummarizer::replying(
            r#"[{"title":"Intro","time":[0,12000],"active":false},{"title":"Deep dive","time":[12000,30000],"active":false}]"#,
        );
        let synth = ChapterSynthesizer::new(Some(fake.clone()), Duration::from_secs(5));

        let chapters = synth.synthesize(&segments(4)).await;

        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[1].start_time_ms, 12_000);
        assert_eq!(chapters[1].end_time_ms, 30_000);
    }

    #[tokio::test]
    async fn test_service_failure_uses_fallback() {
        let synth = ChapterSynthesizer::new(Some(FakeSummarizer::failing()), Duration::from_secs(5));
        let input = segments(12);
        assert_eq!(synth.synthesize(&input).await, fallback::synthesize(&input));
    }

    #[tokio::test]
    async fn test_malformed_responses_use_fallback() {
        let input = segments(6);
        for body in ["Sure! Here are your chapters", "[]", r#"{"title":"x"}"#, r#"[{"title":"","time":[0,1]}]"#] {
            let synth = ChapterSynthesizer::new(Some(FakeSummarizer::replying(body)), Duration::from_secs(5));
            assert_eq!(synth.synthesize(&input).await, fallback::synthesize(&input), "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_single_segment_skips_service() {
        let fake = FakeSummarizer::replying(r#"[{"title":"A","time":[0,30000]}]"#);
        let synth = ChapterSynthesizer::new(Some(fake.clone()), Duration::from_secs(5));

        let chapters = synth.synthesize(&segments(1)).await;

        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert_eq!(chapters[0].title, "Chapter 1");
    }

    #[tokio::test]
    async fn test_missing_summarizer_uses_fallback() {
        let synth = ChapterSynthesizer::new(None, Duration::from_secs(5));
        let chapters = synth.synthesize(&segments(3)).await;
        assert_eq!(chapters, fallback::synthesize(&segments(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_fallback() {
        let fake = Arc::new(FakeSummarizer {
            reply: Ok(r#"[{"title":"Late","time":[0,30000]}]"#.to_string()),
            delay: Duration::from_secs(60),
            calls: AtomicUsize::new(0),
        });
        let synth = ChapterSynthesizer::new(Some(fake), Duration::from_secs(1));

        let chapters = synth.synthesize(&segments(5)).await;
        assert_eq!(chapters[0].title, "Chapter 1");
    }

    #[test]
    fn test_parse_chapters_rounds_and_drops_invalid() {
        let chapters = parse_chapters(
            r#" [{"title":"A","time":[0.4,9999.6]},{"title":"Backwards","time":[5000,100]},{"nope":1}] "#,
        )
        .unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].start_time_ms, 0);
        assert_eq!(chapters[0].end_time_ms, 10_000);
    }
}
