use crate::sse_stream::SseEvent;
use crate::{Error, GenerationRequest, ProviderMetadata};

/// What one stream chunk contributes to the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChunk {
    /// Incremental answer text.
    pub content: Option<String>,
    /// Incremental reasoning text from a dedicated channel.
    pub thinking: Option<String>,
    /// The chunk carried a terminal finish reason; stop reading after applying it.
    pub finished: bool,
}

impl ParsedChunk {
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            content: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn thinking(delta: impl Into<String>) -> Self {
        Self {
            thinking: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn finished(mut self) -> Self {
        self.finished = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty)
            && self.thinking.as_deref().is_none_or(str::is_empty)
    }
}

/// Per-request decoder for one backend's stream chunks.
///
/// A parser may keep state between chunks of the same request; a fresh parser is
/// created for every request.
pub trait ResponseParser: Send {
    /// True if the chunk is the backend's termination sentinel and carries nothing else.
    fn is_done(&self, event: &SseEvent) -> bool;

    /// Extract deltas from one chunk. Undecodable chunks return [`Error::MalformedChunk`];
    /// any other error aborts the stream.
    fn parse(&mut self, event: &SseEvent) -> Result<ParsedChunk, Error>;
}

/// Wire-level strategy for one backend family: request building, authentication and
/// response parsing.
pub trait Backend: Send + Sync + 'static {
    /// URL the request is POSTed to.
    fn endpoint(&self, metadata: &ProviderMetadata, request: &GenerationRequest) -> String;

    /// JSON payload for the request. Unset optional sampling fields are omitted.
    fn build_request(
        &self,
        metadata: &ProviderMetadata,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, Error>;

    /// Attach credentials and vendor headers.
    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &str,
        request: &GenerationRequest,
    ) -> reqwest::RequestBuilder;

    /// Fresh parser for one request; `metadata.id` labels upstream errors.
    fn new_parser(&self, metadata: &ProviderMetadata) -> Box<dyn ResponseParser>;
}
