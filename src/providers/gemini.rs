// colloquy/src/providers/gemini.rs

use super::{check_status, concat_transcript, merge_extra, sse_data, LineBuffer, Provider};
use crate::config::ModelConfig;
use crate::errors::ProviderError;
use crate::models::chat::Message;
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const BASE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Cheaper models tried once each after the retry budget on the configured
/// model is exhausted.
pub const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-1.5-flash",
];

const PROVIDER_NAME: &str = "gemini";

// Very long prompts trip backend request limits; keep the tail, which holds
// the most recent context.
const MAX_PROMPT_CHARS: usize = 20_000;

pub struct GeminiProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
    base_endpoint: String,
}

impl GeminiProvider {
    pub fn new(config: ModelConfig, http_client: Client, api_key: String) -> Self {
        Self {
            config,
            http_client,
            api_key,
            base_endpoint: BASE_ENDPOINT.to_string(),
        }
    }

    /// Overrides the default base endpoint, for gateways and tests.
    pub fn with_endpoint(mut self, base_endpoint: impl Into<String>) -> Self {
        self.base_endpoint = base_endpoint.into();
        self
    }

    pub fn endpoint_for(&self, model: &str, stream: bool) -> String {
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        format!("{}/{}:{}", self.base_endpoint, model, method)
    }

    pub(crate) fn build_payload(&self, messages: &[Message]) -> Value {
        let prompt = trim_to_tail(&concat_transcript(messages), MAX_PROMPT_CHARS);
        let mut payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topP": self.config.top_p,
                "maxOutputTokens": self.config.max_tokens,
            },
        });
        merge_extra(&mut payload, &self.config);
        payload
    }

    pub(crate) fn parse_response(&self, body: &str) -> Result<String, ProviderError> {
        let raw: Value = serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER_NAME,
            message: e.to_string(),
        })?;
        candidate_text(&raw).ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER_NAME,
            message: format!("missing candidates[0].content.parts in: {}", body),
        })
    }

    fn request(&self, url: &str, payload: &Value) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload);
        if !self.api_key.is_empty() {
            request = request.header("x-goog-api-key", &self.api_key);
        }
        request
    }
}

fn candidate_text(envelope: &Value) -> Option<String> {
    let parts = envelope["candidates"][0]["content"]["parts"].as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .concat(),
    )
}

fn trim_to_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete_as(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        debug!(model = %model, num_messages = messages.len(), "Requesting Gemini completion");
        let url = self.endpoint_for(model, false);
        let payload = self.build_payload(messages);
        let response = self
            .request(&url, &payload)
            .send()
            .await
            .map_err(ProviderError::Transport)?;
        let response = check_status(PROVIDER_NAME, model, response).await?;
        let body = response.text().await.map_err(ProviderError::Transport)?;
        self.parse_response(&body)
    }

    fn stream(&self, messages: &[Message]) -> BoxStream<'static, Result<String, ProviderError>> {
        let model = self.config.model.clone();
        let url = self.endpoint_for(&model, true);
        let payload = self.build_payload(messages);
        let request = self.request(&url, &payload);
        Box::pin(try_stream! {
            let response = request.send().await.map_err(ProviderError::Transport)?;
            let response = check_status(PROVIDER_NAME, &model, response).await?;
            let mut bytes = response.bytes_stream();
            let mut buffer = LineBuffer::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(ProviderError::Transport)?;
                for line in buffer.push(&chunk) {
                    let Some(data) = sse_data(&line) else { continue };
                    let Ok(event) = serde_json::from_str::<Value>(data) else { continue };
                    if let Some(text) = candidate_text(&event) {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                }
            }
        })
    }
}
