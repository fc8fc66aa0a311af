// colloquy/src/providers/openai.rs

use super::{check_status, messages_json, merge_extra, sse_data, LineBuffer, Provider};
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

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const PROVIDER_NAME: &str = "openai";

pub struct OpenAiProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiProvider {
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

    pub(crate) fn build_payload(&self, model: &str, messages: &[Message], stream: bool) -> Value {
        let mut payload = json!({
            "model": model,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens,
            "messages": messages_json(messages),
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
        raw["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_NAME,
                message: format!("missing choices[0].message.content in: {}", body),
            })
    }

    fn request(&self, payload: &Value) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(payload);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        request
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
        debug!(model = %model, num_messages = messages.len(), "Requesting OpenAI completion");
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
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    if let Ok(event) = serde_json::from_str::<Value>(data) {
                        if let Some(delta) = event["choices"][0]["delta"]["content"].as_str() {
                            if !delta.is_empty() {
                                yield delta.to_string();
                            }
                        }
                    }
                }
            }
        })
    }
}
