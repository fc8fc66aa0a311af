// colloquy/src/config.rs

//! Configuration structures for providers and their credentials.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// The fixed set of supported backend families.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Gemini,
    Anthropic,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        };
        f.write_str(s)
    }
}

/// Generation parameters for one provider/model pair.
///
/// `extra` carries provider-specific overrides merged verbatim into the
/// request payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn default_temperature() -> f64 {
    0.2
}
fn default_top_p() -> f64 {
    0.95
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_stream() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            model: "qwen2.5-coder:7b".to_string(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            stream: default_stream(),
            extra: Map::new(),
        }
    }
}

impl ModelConfig {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Parses a model configuration from TOML content and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ModelConfig = toml::from_str(content).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse model config TOML");
            anyhow!(e)
        })
        .context("Failed to parse model configuration TOML content.")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("'model' in model config is empty."));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!(
                "'temperature' must be within [0.0, 2.0], got {}.",
                self.temperature
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(anyhow!("'top_p' must be within [0.0, 1.0], got {}.", self.top_p));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("'max_tokens' must be greater than zero."));
        }
        Ok(())
    }
}

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Per-provider credentials and endpoints, resolved once at construction
/// and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_host: String,
}

impl ProviderSettings {
    /// Resolves settings from the environment (including a `.env` file if
    /// one is present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            ollama_host: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string()),
        }
    }

    /// Validates that the ollama host is a well-formed URL.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.ollama_host).with_context(|| {
            format!("Invalid URL format for ollama host ('{}').", self.ollama_host)
        })?;
        Ok(())
    }

    /// The API key for `kind`, if one was resolved.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::Ollama => None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            anthropic_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }
}
