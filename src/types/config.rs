use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Wire protocol spoken by a backend. Selects the request builder and response parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `POST /chat/completions`, deltas at `choices[0].delta.content`.
    OpenAiCompatible,
    /// Anthropic Messages API with typed SSE events.
    Anthropic,
    /// Google Generative Language API (`streamGenerateContent?alt=sse`).
    Gemini,
    /// DashScope native generation API; every event carries the full text so far.
    DashScope,
}

/// Static description of a backend.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub id: String,
    pub display_name: String,
    pub endpoint: String,
    pub default_model: String,
    pub models: Vec<String>,
    pub supports_streaming: bool,
    pub supports_thinking: bool,
    /// Expected key shape. `None` accepts any key.
    pub key_pattern: Option<Regex>,
    pub wire_format: WireFormat,
    /// Overrides the client-wide idle threshold used to leave the thinking phase.
    pub thinking_idle_threshold: Option<Duration>,
    /// Overrides the client-wide request timeout.
    pub request_timeout: Option<Duration>,
    /// Custom providers accept any model id.
    pub is_custom: bool,
}

impl ProviderMetadata {
    pub fn supports_model(&self, model: &str) -> bool {
        self.is_custom || self.models.iter().any(|m| m == model)
    }

    pub fn validate_api_key(&self, key: &str) -> bool {
        match &self.key_pattern {
            Some(pattern) => pattern.is_match(key.trim()),
            None => true,
        }
    }
}

/// User-supplied description of an OpenAI-compatible backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    /// Must start with [`crate::registry::CUSTOM_PROVIDER_PREFIX`].
    pub id: String,
    pub display_name: String,
    /// Base URL such as `https://llm.example.com/v1`; `/chat/completions` is appended
    /// unless already present.
    pub base_url: String,
    pub models: Vec<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub supports_thinking: bool,
    #[serde(default)]
    pub thinking_idle_threshold_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}
