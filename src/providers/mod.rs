// colloquy/src/providers/mod.rs

//! Backend provider interface and implementations.
//!
//! Each backend family differs only in how the transcript is shaped into
//! its request structure and how its response envelope unwraps into plain
//! text. Selection is by explicit configuration through [`provider_for`],
//! never by runtime type inspection.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::config::{ModelConfig, ProviderKind, ProviderSettings};
use crate::errors::ProviderError;
use crate::models::chat::Message;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

/// A text-generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend family name, for logs and error messages.
    fn name(&self) -> &'static str;

    /// The configured model identifier.
    fn model(&self) -> &str;

    /// One completion against an explicit model id. The fallback chain uses
    /// this to try alternate models on the same transport.
    async fn complete_as(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ProviderError>;

    /// One completion against the configured model.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.complete_as(self.model(), messages).await
    }

    /// A fresh, finite stream of text fragments. Not restartable; each call
    /// starts a new backend request. Unlike [`Provider::complete`], the
    /// streaming path is single-attempt: it is not wrapped by the retry
    /// layer, since replaying a partially-consumed stream would hand the
    /// caller duplicate fragments.
    fn stream(&self, messages: &[Message]) -> BoxStream<'static, Result<String, ProviderError>>;
}

/// Constructs the provider selected by `config`, resolving credentials and
/// endpoints from `settings` exactly once.
pub fn provider_for(
    config: ModelConfig,
    settings: &ProviderSettings,
    http_client: Client,
) -> Result<Box<dyn Provider>> {
    let kind = config.provider;
    let api_key = settings.api_key(kind).map(str::to_string).unwrap_or_else(|| {
        if kind != ProviderKind::Ollama {
            warn!(provider = %kind, "No API key resolved for provider");
        }
        String::new()
    });
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::Ollama => Box::new(ollama::OllamaProvider::new(
            config,
            http_client,
            settings.ollama_host.clone(),
        )),
        ProviderKind::OpenAi => {
            Box::new(openai::OpenAiProvider::new(config, http_client, api_key))
        }
        ProviderKind::Gemini => {
            Box::new(gemini::GeminiProvider::new(config, http_client, api_key))
        }
        ProviderKind::Anthropic => {
            Box::new(anthropic::AnthropicProvider::new(config, http_client, api_key))
        }
    };
    Ok(provider)
}

/// Maps a non-success HTTP response to the error taxonomy.
pub(crate) async fn check_status(
    provider: &'static str,
    model: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, model, status.as_u16(), body))
}

pub(crate) fn status_error(
    provider: &'static str,
    model: &str,
    status: u16,
    message: String,
) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth { provider, message },
        404 => ProviderError::ModelNotFound {
            provider,
            model: model.to_string(),
        },
        400..=499 => ProviderError::Request {
            provider,
            status,
            message,
        },
        _ => ProviderError::Server {
            provider,
            status,
            message,
        },
    }
}

/// Per-message array shaping shared by the openai and ollama families.
pub(crate) fn messages_json(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| json!({"role": m.role.to_string(), "content": m.content}))
            .collect(),
    )
}

/// Single concatenated-text shaping shared by the anthropic and gemini
/// families: the whole transcript collapses into one user turn.
pub(crate) fn concat_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merges provider-specific overrides into a request payload.
pub(crate) fn merge_extra(payload: &mut Value, config: &ModelConfig) {
    if let Some(object) = payload.as_object_mut() {
        for (key, value) in &config.extra {
            object.insert(key.clone(), value.clone());
        }
    }
}

/// Accumulates byte chunks and drains complete lines, for SSE and NDJSON
/// response bodies.
#[derive(Default)]
pub(crate) struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        let mut lines = Vec::new();
        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

/// Extracts the payload of a server-sent-event data line, if this is one.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}
