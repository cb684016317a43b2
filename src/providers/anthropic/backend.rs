use super::types::*;
use crate::provider::{Backend, ParsedChunk, ResponseParser};
use crate::sse_stream::SseEvent;
use crate::types::Role;
use crate::{Error, GenerationRequest, ProviderMetadata};

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API rejects requests without `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude backend. Authenticates with `x-api-key` instead of a bearer token.
#[derive(Debug, Default, Clone)]
pub struct AnthropicBackend;

impl AnthropicBackend {
    pub fn new() -> Self {
        Self
    }

    /// Convert a generation request to the Messages format. System text moves to the
    /// top-level `system` field.
    fn convert_request(request: &GenerationRequest) -> AnthropicRequest {
        let mut system = None;
        let mut messages = Vec::new();

        for message in request.messages() {
            match message.role {
                Role::System => system = Some(message.content),
                Role::User | Role::Assistant => messages.push(AnthropicMessage {
                    role: message.role.as_str().to_string(),
                    content: message.content,
                }),
            }
        }

        AnthropicRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: request.stream,
            system,
            temperature: request.temperature,
        }
    }
}

impl Backend for AnthropicBackend {
    fn endpoint(&self, metadata: &ProviderMetadata, _request: &GenerationRequest) -> String {
        metadata.endpoint.clone()
    }

    fn build_request(
        &self,
        _metadata: &ProviderMetadata,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(Self::convert_request(request))?)
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &str,
        _request: &GenerationRequest,
    ) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn new_parser(&self, metadata: &ProviderMetadata) -> Box<dyn ResponseParser> {
        Box::new(AnthropicParser::new(metadata.id.clone()))
    }
}

/// Decoder for typed Messages API events.
#[derive(Debug)]
pub struct AnthropicParser {
    provider: String,
}

impl AnthropicParser {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }

    fn block_to_chunk(block: AnthropicContentBlock) -> ParsedChunk {
        match block {
            AnthropicContentBlock::Text { text } if !text.is_empty() => ParsedChunk::content(text),
            AnthropicContentBlock::Thinking { thinking } if !thinking.is_empty() => {
                ParsedChunk::thinking(thinking)
            }
            _ => ParsedChunk::default(),
        }
    }
}

impl ResponseParser for AnthropicParser {
    fn is_done(&self, event: &SseEvent) -> bool {
        if let Some(event_type) = &event.event_type {
            return event_type == "message_stop";
        }
        serde_json::from_str::<EventType>(event.data.trim())
            .map(|t| t.kind == "message_stop")
            .unwrap_or(false)
    }

    fn parse(&mut self, event: &SseEvent) -> Result<ParsedChunk, Error> {
        let stream_event: AnthropicStreamEvent = serde_json::from_str(event.data.trim())
            .map_err(|e| Error::malformed(format!("{}: {e}", self.provider)))?;

        match stream_event {
            AnthropicStreamEvent::ContentBlockStart { content_block } => {
                Ok(Self::block_to_chunk(content_block))
            }
            AnthropicStreamEvent::ContentBlockDelta { delta } => Ok(match delta {
                AnthropicContentDelta::TextDelta { text } => ParsedChunk::content(text),
                AnthropicContentDelta::ThinkingDelta { thinking } => {
                    ParsedChunk::thinking(thinking)
                }
                AnthropicContentDelta::Other => ParsedChunk::default(),
            }),
            AnthropicStreamEvent::Message { content } => {
                // Non-streaming body: fold all blocks into one chunk
                let mut chunk = ParsedChunk::default().finished();
                for block in content {
                    let part = Self::block_to_chunk(block);
                    if let Some(text) = part.content {
                        chunk.content.get_or_insert_with(String::new).push_str(&text);
                    }
                    if let Some(thinking) = part.thinking {
                        chunk
                            .thinking
                            .get_or_insert_with(String::new)
                            .push_str(&thinking);
                    }
                }
                Ok(chunk)
            }
            AnthropicStreamEvent::MessageStop => Ok(ParsedChunk::default().finished()),
            AnthropicStreamEvent::Error { error } => {
                Err(Error::provider(&self.provider, error.message))
            }
            AnthropicStreamEvent::MessageStart
            | AnthropicStreamEvent::ContentBlockStop
            | AnthropicStreamEvent::MessageDelta
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Unknown => Ok(ParsedChunk::default()),
        }
    }
}
