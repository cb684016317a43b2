use serde::{Deserialize, Serialize};

/// Anthropic message format.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

/// Messages API request.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Content block in a response or a `content_block_start` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// Incremental update inside a `content_block_delta` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub message: String,
}

/// Streaming event, or the whole body of a non-streaming response (`type: "message"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    Message {
        #[serde(default)]
        content: Vec<AnthropicContentBlock>,
    },
    MessageStart,
    ContentBlockStart {
        content_block: AnthropicContentBlock,
    },
    ContentBlockDelta {
        delta: AnthropicContentDelta,
    },
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Ping,
    Error {
        error: AnthropicErrorBody,
    },
    #[serde(other)]
    Unknown,
}

/// Just the discriminator, for cheap sentinel checks.
#[derive(Debug, Clone, Deserialize)]
pub struct EventType {
    #[serde(rename = "type")]
    pub kind: String,
}
