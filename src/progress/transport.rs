// progress/transport.rs - Transcription service transport

use crate::config::EngineConfig;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use std::time::Duration;

/// Raw byte chunks of the progress stream.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Transport errors with retry classification
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    TimeoutError,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Stream ended before the transcript completed")]
    EndOfStream,
}

impl TransportError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::NetworkError(_)
                | TransportError::TimeoutError
                | TransportError::EndOfStream
        ) || matches!(self, TransportError::Http { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimeoutError
        } else {
            TransportError::NetworkError(e.to_string())
        }
    }
}

/// Transcription Service seam: a progress stream and a one-shot fallback.
#[async_trait]
pub trait TranscriptionTransport: Send + Sync {
    /// Open the line-oriented progress stream for `audio_url`
    async fn open_progress_stream(&self, audio_url: &str) -> Result<ByteStream, TransportError>;

    /// Fetch the full annotated transcript in one request
    async fn fetch_transcript(&self, audio_url: &str) -> Result<String, TransportError>;

    /// Transport name
    fn name(&self) -> &str;
}

pub struct HttpTranscriptionTransport {
    client: Client,
    base_url: String,
    progress_path: String,
    transcript_path: String,
    timeout: Duration,
}

impl HttpTranscriptionTransport {
    pub fn new(base_url: String, progress_path: String, transcript_path: String, timeout: Duration) -> Self {
        // No overall timeout here: the progress stream stays open for the
        // whole job. The consumer applies an idle timeout per read instead.
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_default();

        tracing::info!("Transcription transport initialized: {}", base_url);

        Self {
            client,
            base_url,
            progress_path,
            transcript_path,
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.transcription_base_url.clone(),
            config.progress_path.clone(),
            config.transcript_path.clone(),
            config.stream_timeout(),
        )
    }

    /// `{base}{path}?url=<audio url, form-encoded>`
    pub fn endpoint(&self, path: &str, audio_url: &str) -> Result<Url, TransportError> {
        Url::parse_with_params(&format!("{}{}", self.base_url, path), &[("url", audio_url)])
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl TranscriptionTransport for HttpTranscriptionTransport {
    async fn open_progress_stream(&self, audio_url: &str) -> Result<ByteStream, TransportError> {
        let url = self.endpoint(&self.progress_path, audio_url)?;
        tracing::debug!("Opening progress stream: {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::error_for_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed())
    }

    async fn fetch_transcript(&self, audio_url: &str) -> Result<String, TransportError> {
        let url = self.endpoint(&self.transcript_path, audio_url)?;
        tracing::debug!("Fetching transcript: {}", url);

        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let response = Self::error_for_status(response).await?;

        Ok(response.text().await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}
