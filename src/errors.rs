// colloquy/src/errors.rs
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a backend provider call.
///
/// The split between permanent and transient variants drives the retry
/// layer: transient errors are retried with backoff and may escalate to the
/// fallback model chain, permanent errors surface immediately.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credentials rejected by the backend (401/403).
    #[error("{provider}: authentication rejected: {message}")]
    Auth {
        provider: &'static str,
        message: String,
    },

    /// The requested model does not exist on the backend (404).
    #[error("{provider}: model not found: {model}")]
    ModelNotFound {
        provider: &'static str,
        model: String,
    },

    /// Any other client-side rejection (4xx). Not retryable.
    #[error("{provider}: request rejected ({status}): {message}")]
    Request {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Server-side failure (5xx). Retryable.
    #[error("{provider}: server error ({status}): {message}")]
    Server {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// A single attempt exceeded its wall-clock budget. Retryable.
    #[error("{provider}: request timed out after {timeout:?}")]
    Timeout {
        provider: &'static str,
        timeout: Duration,
    },

    /// Connection-level failure before a status line was read. Retryable.
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend answered 2xx but the body did not match the expected
    /// envelope. Retrying cannot fix a shape mismatch.
    #[error("{provider}: malformed response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Whether the retry layer should attempt this call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Server { .. }
                | ProviderError::Timeout { .. }
                | ProviderError::Transport(_)
        )
    }
}

/// Errors surfaced to the caller of a conversation loop.
///
/// Conversational failures (unknown tool, bad arguments, tool execution
/// errors, unparsed replies) never appear here; they are absorbed into the
/// transcript and resolved to a textual result. Only exhausted provider
/// failures propagate.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn config(msg: impl Into<String>) -> Self {
        AgentError::Config(msg.into())
    }
}
