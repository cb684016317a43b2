use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Chat completions request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One streamed chunk, or the whole body of a non-streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Present on streamed chunks.
    #[serde(default)]
    pub delta: Option<ChunkMessage>,
    /// Present on non-streaming responses.
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: Option<String>,
    /// DeepSeek / Moonshot reasoning channel.
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// OpenRouter reasoning channel.
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Error object some servers emit inside an otherwise successful stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}
