// colloquy/src/providers/anthropic.rs

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

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

const PROVIDER_NAME: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(config: ModelConfig, http_client: Client, api_key: String) -> Self {
        Self {
            config,
            http_client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Overrides the default endpoint, for gateways and tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // The whole transcript collapses into one user turn; the messages API
    // rejects a leading system/tool role in the turn array.
    pub(crate) fn build_payload(&self, model: &str, messages: &[Message], stream: bool) -> Value {
        let mut payload = json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{"role": "user", "content": concat_transcript(messages)}],
        });
        if stream {
            payload["stream"] = json!(true);
        }
        merge_extra(&mut payload, &self.config);
        payload
    }

    pub(crate) fn parse_response(&self, body: &str) -> Result<String, ProviderError> {
        let raw: Value = serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER_NAME,
            message: e.to_string(),
        })?;
        let blocks = raw["content"]
            .as_array()
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_NAME,
                message: format!("missing content blocks in: {}", body),
            })?;
        Ok(blocks
            .iter()
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .concat())
    }

    fn request(&self, payload: &Value) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("anthropic-version", API_VERSION)
            .json(payload);
        if !self.api_key.is_empty() {
            request = request.header("x-api-key", &self.api_key);
        }
        request
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
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
        debug!(model = %model, num_messages = messages.len(), "Requesting Anthropic completion");
        let payload = self.build_payload(model, messages, false);
        let response = self
            .request(&payload)
            .send()
            .await
            .map_err(ProviderError::Transport)?;
        let response = check_status(PROVIDER_NAME, model, response).await?;
        let body = response.text().await.map_err(ProviderError::Transport)?;
        self.parse_response(&body)
    }

    fn stream(&self, messages: &[Message]) -> BoxStream<'static, Result<String, ProviderError>> {
        let model = self.config.model.clone();
        let payload = self.build_payload(&model, messages, true);
        let request = self.request(&payload);
        Box::pin(try_stream! {
            let response = request.send().await.map_err(ProviderError::Transport)?;
            let response = check_status(PROVIDER_NAME, &model, response).await?;
            let mut bytes = response.bytes_stream();
            let mut buffer = LineBuffer::new();
            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(ProviderError::Transport)?;
                for line in buffer.push(&chunk) {
                    let Some(data) = sse_data(&line) else { continue };
                    let Ok(event) = serde_json::from_str::<Value>(data) else { continue };
                    match event["type"].as_str() {
                        Some("content_block_delta") => {
                            if let Some(text) = event["delta"]["text"].as_str() {
                                if !text.is_empty() {
                                    yield text.to_string();
                                }
                            }
                        }
                        Some("message_stop") => break 'outer,
                        _ => {}
                    }
                }
            }
        })
    }
}
