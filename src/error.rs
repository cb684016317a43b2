use std::time::Duration;

use thiserror::Error;

/// Longest prompt prefix carried on a [`GenerationError`].
pub const PROMPT_PREVIEW_CHARS: usize = 80;

/// Errors that can occur while resolving providers or running a generation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no API key configured for provider {0}")]
    CredentialMissing(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("model {model} is not supported by provider {provider}")]
    UnsupportedModel { provider: String, model: String },

    #[error("invalid custom provider: {0}")]
    InvalidCustomProvider(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed stream chunk: {0}")]
    MalformedChunk(String),

    #[error("stream aborted after {0} consecutive malformed chunks")]
    ParseFailureExceeded(u32),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Raised internally when the caller's token fires. Never delivered to `on_error`.
    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedChunk(message.into())
    }

    /// Returns true for transient errors that may succeed if the caller retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Transport(_) => true,
            Error::Http { status, .. } => *status == 429 || *status >= 500,
            Error::Streaming(_) => true,
            _ => false,
        }
    }
}

/// A request-scoped failure, tagged with the provider, model and a short prompt preview.
///
/// The credential used for the request is never part of this value.
#[derive(Error, Debug)]
#[error("{provider}/{model}: {source}")]
pub struct GenerationError {
    pub provider: String,
    pub model: String,
    pub prompt_preview: String,
    #[source]
    pub source: Error,
}

impl GenerationError {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        prompt: &str,
        source: Error,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            prompt_preview: prompt_preview(prompt),
            source,
        }
    }

    pub fn error(&self) -> &Error {
        &self.source
    }

    pub fn into_error(self) -> Error {
        self.source
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Truncate a prompt on a character boundary for diagnostics.
pub fn prompt_preview(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let preview: String = chars.by_ref().take(PROMPT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}
