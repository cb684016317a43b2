use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// DashScope text-generation request.
#[derive(Debug, Clone, Serialize)]
pub struct DashScopeRequest {
    pub model: String,
    pub input: DashScopeInput,
    pub parameters: DashScopeParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashScopeInput {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashScopeParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub result_format: &'static str,
    /// `false` makes every event carry the full text generated so far.
    pub incremental_output: bool,
}

/// One streamed event, or the whole body of a non-streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeResponse {
    #[serde(default)]
    pub output: Option<DashScopeOutput>,
    /// Present on failures, together with `message`.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeOutput {
    #[serde(default)]
    pub text: Option<String>,
    /// The literal string `"null"` while generation is in progress.
    #[serde(default)]
    pub finish_reason: Option<String>,
}
