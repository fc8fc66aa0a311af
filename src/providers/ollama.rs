// colloquy/src/providers/ollama.rs

use super::{check_status, messages_json, merge_extra, LineBuffer, Provider};
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

const PROVIDER_NAME: &str = "ollama";

/// Local Ollama backend. The host URL comes from settings, never
/// hard-coded at the call site.
pub struct OllamaProvider {
    config: ModelConfig,
    http_client: Client,
    endpoint: String,
}

impl OllamaProvider {
    pub fn new(config: ModelConfig, http_client: Client, host: String) -> Self {
        debug!(model = %config.model, host = %host, "Creating Ollama provider");
        Self {
            config,
            http_client,
            endpoint: format!("{}/api/chat", host.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn build_payload(&self, model: &str, messages: &[Message], stream: bool) -> Value {
        let mut payload = json!({
            "model": model,
            "messages": messages_json(messages),
            "stream": stream,
            "options": {
                "temperature": self.config.temperature,
                "top_p": self.config.top_p,
                "num_predict": self.config.max_tokens,
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
        raw["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_NAME,
                message: format!("missing message.content in: {}", body),
            })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
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
        debug!(model = %model, num_messages = messages.len(), "Requesting Ollama completion");
        let payload = self.build_payload(model, messages, false);
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload)
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
        let request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);
        Box::pin(try_stream! {
            let response = request.send().await.map_err(ProviderError::Transport)?;
            let response = check_status(PROVIDER_NAME, &model, response).await?;
            let mut bytes = response.bytes_stream();
            let mut buffer = LineBuffer::new();
            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(ProviderError::Transport)?;
                for line in buffer.push(&chunk) {
                    if line.is_empty() {
                        continue;
                    }
                    // One JSON object per line.
                    let Ok(event) = serde_json::from_str::<Value>(&line) else { continue };
                    if let Some(fragment) = event["message"]["content"].as_str() {
                        if !fragment.is_empty() {
                            yield fragment.to_string();
                        }
                    }
                    if event["done"].as_bool() == Some(true) {
                        break 'outer;
                    }
                }
            }
        })
    }
}
