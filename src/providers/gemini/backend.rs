use super::types::*;
use crate::provider::{Backend, ParsedChunk, ResponseParser};
use crate::sse_stream::SseEvent;
use crate::types::Role;
use crate::{Error, GenerationRequest, ProviderMetadata};

/// Google Generative Language API backend.
#[derive(Debug, Default, Clone)]
pub struct GeminiBackend;

impl GeminiBackend {
    pub fn new() -> Self {
        Self
    }

    /// Only the 2.5 family accepts a thinking configuration.
    fn wants_thoughts(metadata: &ProviderMetadata, model: &str) -> bool {
        metadata.supports_thinking && model.starts_with("gemini-2.5")
    }

    fn convert_request(metadata: &ProviderMetadata, request: &GenerationRequest) -> GeminiRequest {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for message in request.messages() {
            match message.role {
                Role::System => {
                    system_instruction = Some(GeminiContent::text(None, message.content));
                }
                Role::User => contents.push(GeminiContent::text(Some("user"), message.content)),
                Role::Assistant => {
                    contents.push(GeminiContent::text(Some("model"), message.content))
                }
            }
        }

        let generation_config = GeminiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            thinking_config: Self::wants_thoughts(metadata, &request.model)
                .then_some(GeminiThinkingConfig {
                    include_thoughts: true,
                }),
        };
        let has_config = generation_config.temperature.is_some()
            || generation_config.max_output_tokens.is_some()
            || generation_config.thinking_config.is_some();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: has_config.then_some(generation_config),
        }
    }
}

impl Backend for GeminiBackend {
    /// The model and method are part of the path; streaming adds `alt=sse`.
    fn endpoint(&self, metadata: &ProviderMetadata, request: &GenerationRequest) -> String {
        let base = metadata.endpoint.trim_end_matches('/');
        if request.stream {
            format!("{base}/{}:streamGenerateContent?alt=sse", request.model)
        } else {
            format!("{base}/{}:generateContent", request.model)
        }
    }

    fn build_request(
        &self,
        metadata: &ProviderMetadata,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(Self::convert_request(
            metadata, request,
        ))?)
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &str,
        _request: &GenerationRequest,
    ) -> reqwest::RequestBuilder {
        builder.header("x-goog-api-key", api_key)
    }

    fn new_parser(&self, metadata: &ProviderMetadata) -> Box<dyn ResponseParser> {
        Box::new(GeminiParser::new(metadata.id.clone()))
    }
}

/// Decoder for `candidates[0].content.parts`. Parts flagged `thought` are reasoning.
#[derive(Debug)]
pub struct GeminiParser {
    provider: String,
}

impl GeminiParser {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

impl ResponseParser for GeminiParser {
    /// Gemini has no sentinel event; the stream simply ends.
    fn is_done(&self, _event: &SseEvent) -> bool {
        false
    }

    fn parse(&mut self, event: &SseEvent) -> Result<ParsedChunk, Error> {
        let response: GeminiResponse = serde_json::from_str(event.data.trim())
            .map_err(|e| Error::malformed(format!("{}: {e}", self.provider)))?;

        if let Some(error) = response.error {
            return Err(Error::provider(&self.provider, error.message));
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Ok(ParsedChunk::default());
        };

        let mut chunk = ParsedChunk {
            finished: candidate.finish_reason.is_some(),
            ..ParsedChunk::default()
        };
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            let Some(text) = part.text.filter(|t| !t.is_empty()) else {
                continue;
            };
            let target = if part.thought.unwrap_or(false) {
                &mut chunk.thinking
            } else {
                &mut chunk.content
            };
            target.get_or_insert_with(String::new).push_str(&text);
        }

        Ok(chunk)
    }
}
