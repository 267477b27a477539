// chapters/openai.rs - OpenAI-compatible chat completions chapter summarizer

use super::{ChapterSummarizer, SynthesisError};
use crate::transcript::{SegmentPayload, TranscriptSegment};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are an assistant that receives podcast transcripts and segments them into chapters. Based on the transcript with timestamps, identify major topics and create chapter titles. Return ONLY a valid JSON array in this exact format: [{\"title\": \"Chapter Title\", \"time\": [startTimeInMs, endTimeInMs], \"active\": false}]. The last chapter should end at 30000ms (30 seconds). Ensure the JSON is properly formatted.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 800;

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiSummarizer {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(api_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        tracing::info!("Chapter summarizer initialized: model={}", model);

        Self {
            client,
            api_url,
            api_key,
            model,
        }
    }

    fn build_request(&self, segments: &[TranscriptSegment]) -> Result<ChatRequest, SynthesisError> {
        let payload: Vec<SegmentPayload<'_>> = segments.iter().map(SegmentPayload::from).collect();
        let transcript = serde_json::to_string(&payload)
            .map_err(|e| SynthesisError::ProviderError(format!("encode transcript: {}", e)))?;

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: transcript,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        })
    }
}

#[async_trait]
impl ChapterSummarizer for OpenAiSummarizer {
    async fn summarize(&self, segments: &[TranscriptSegment]) -> Result<String, SynthesisError> {
        let request = self.build_request(segments)?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else {
                    SynthesisError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ProviderError(format!(
                "{} ({}): {}",
                self.model, status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("chat envelope: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| SynthesisError::InvalidResponse("no message content".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
