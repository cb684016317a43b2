use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChunkMessage};
use crate::provider::{Backend, ParsedChunk, ResponseParser};
use crate::sse_stream::SseEvent;
use crate::{Error, GenerationRequest, ProviderMetadata};

/// Backend for any server speaking the OpenAI chat completions protocol.
#[derive(Debug, Default, Clone)]
pub struct OpenAICompatibleBackend;

impl OpenAICompatibleBackend {
    pub fn new() -> Self {
        Self
    }

    /// Convert a generation request to the chat completions format.
    fn convert_request(request: &GenerationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages(),
            stream: request.stream,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl Backend for OpenAICompatibleBackend {
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
        builder.bearer_auth(api_key)
    }

    fn new_parser(&self, metadata: &ProviderMetadata) -> Box<dyn ResponseParser> {
        Box::new(OpenAICompatibleParser::new(metadata.id.clone()))
    }
}

/// Stateless decoder for `choices[0].delta` chunks.
#[derive(Debug)]
pub struct OpenAICompatibleParser {
    provider: String,
}

impl OpenAICompatibleParser {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

impl ResponseParser for OpenAICompatibleParser {
    fn is_done(&self, event: &SseEvent) -> bool {
        event.is_done()
    }

    fn parse(&mut self, event: &SseEvent) -> Result<ParsedChunk, Error> {
        if event.is_done() {
            return Ok(ParsedChunk::default());
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(event.data.trim())
            .map_err(|e| Error::malformed(format!("{}: {e}", self.provider)))?;

        if let Some(error) = chunk.error {
            return Err(Error::provider(&self.provider, error.message));
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            // Usage-only or keep-alive chunk
            return Ok(ParsedChunk::default());
        };

        let message = choice.delta.or(choice.message).unwrap_or_default();
        let ChunkMessage {
            content,
            reasoning_content,
            reasoning,
        } = message;

        Ok(ParsedChunk {
            content: content.filter(|c| !c.is_empty()),
            thinking: reasoning_content.or(reasoning).filter(|t| !t.is_empty()),
            finished: choice.finish_reason.is_some(),
        })
    }
}
