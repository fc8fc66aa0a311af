// colloquy/src/retry.rs

//! Retry, backoff, and model-fallback policy around provider completions.

use crate::errors::ProviderError;
use crate::models::chat::Message;
use crate::providers::Provider;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure policy for the non-streaming completion path.
///
/// Transient errors are retried with exponential backoff on the configured
/// model; once the attempt budget is exhausted, each fallback model is
/// tried once in priority order. Permanent errors surface immediately.
/// Every attempt, original or fallback, is bounded by an independent
/// wall-clock timeout; a timeout counts as transient.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
    pub fallback_models: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            fallback_models: Vec::new(),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallbacks<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// One resilient completion against the provider's configured model.
    pub async fn complete(
        &self,
        provider: &dyn Provider,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        let mut delay = self.base_delay;
        let mut last_err: Option<ProviderError> = None;

        for attempt in 1..=self.max_attempts {
            match self.attempt(provider, provider.model(), messages).await {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_transient() => {
                    debug!(provider = provider.name(), error = %e, "Permanent provider error, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        model = provider.model(),
                        attempt,
                        error = %e,
                        "Transient provider error"
                    );
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        for fallback in &self.fallback_models {
            debug!(provider = provider.name(), model = %fallback, "Trying fallback model");
            match self.attempt(provider, fallback, messages).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(model = %fallback, error = %e, "Fallback model failed");
                    last_err = Some(e);
                }
            }
        }

        // max_attempts >= 1, so at least one error was recorded by now.
        Err(last_err.unwrap_or(ProviderError::Timeout {
            provider: provider.name(),
            timeout: self.attempt_timeout,
        }))
    }

    async fn attempt(
        &self,
        provider: &dyn Provider,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.attempt_timeout, provider.complete_as(model, messages))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.name(),
                timeout: self.attempt_timeout,
            }),
        }
    }
}
