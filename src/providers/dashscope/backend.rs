use super::types::*;
use crate::provider::{Backend, ParsedChunk, ResponseParser};
use crate::sse_stream::SseEvent;
use crate::{Error, GenerationRequest, ProviderMetadata};

/// Alibaba DashScope native generation API.
#[derive(Debug, Default, Clone)]
pub struct DashScopeBackend;

impl DashScopeBackend {
    pub fn new() -> Self {
        Self
    }

    fn convert_request(request: &GenerationRequest) -> DashScopeRequest {
        DashScopeRequest {
            model: request.model.clone(),
            input: DashScopeInput {
                messages: request.messages(),
            },
            parameters: DashScopeParameters {
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                result_format: "text",
                incremental_output: false,
            },
        }
    }
}

impl Backend for DashScopeBackend {
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
        request: &GenerationRequest,
    ) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(api_key);
        if request.stream {
            builder.header("X-DashScope-SSE", "enable")
        } else {
            builder
        }
    }

    fn new_parser(&self, metadata: &ProviderMetadata) -> Box<dyn ResponseParser> {
        Box::new(DashScopeParser::new(metadata.id.clone()))
    }
}

/// Turns DashScope's cumulative `output.text` into deltas.
#[derive(Debug)]
pub struct DashScopeParser {
    provider: String,
    /// Full text seen in the previous event.
    last_text: String,
}

impl DashScopeParser {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            last_text: String::new(),
        }
    }

    fn delta(&self, text: &str) -> Option<String> {
        if let Some(suffix) = text.strip_prefix(self.last_text.as_str()) {
            return (!suffix.is_empty()).then(|| suffix.to_string());
        }

        // The backend rewrote earlier text. Keep what lies past the old length.
        tracing::warn!(
            provider = %self.provider,
            previous_len = self.last_text.len(),
            new_len = text.len(),
            "cumulative text diverged from previous event"
        );
        text.get(self.last_text.len()..)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl ResponseParser for DashScopeParser {
    fn is_done(&self, _event: &SseEvent) -> bool {
        false
    }

    fn parse(&mut self, event: &SseEvent) -> Result<ParsedChunk, Error> {
        let response: DashScopeResponse = serde_json::from_str(event.data.trim())
            .map_err(|e| Error::malformed(format!("{}: {e}", self.provider)))?;

        if let Some(code) = response.code.filter(|c| !c.is_empty()) {
            let message = response.message.unwrap_or_default();
            return Err(Error::provider(&self.provider, format!("{code}: {message}")));
        }

        let Some(output) = response.output else {
            return Ok(ParsedChunk::default());
        };

        let content = match output.text {
            Some(text) => {
                let delta = self.delta(&text);
                self.last_text = text;
                delta
            }
            None => None,
        };

        let finished = output
            .finish_reason
            .is_some_and(|reason| !reason.is_empty() && reason != "null");

        Ok(ParsedChunk {
            content,
            thinking: None,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin_providers;

    fn event(text: &str, finish_reason: &str) -> SseEvent {
        SseEvent::new(
            serde_json::json!({
                "output": {"text": text, "finish_reason": finish_reason},
                "request_id": "r-1"
            })
            .to_string(),
        )
    }

    #[test]
    fn test_request_shape() {
        let metadata = builtin_providers()
            .into_iter()
            .find(|m| m.id == "qwen")
            .unwrap();
        let request = GenerationRequest::new("n", "hi", "qwen-plus").with_temperature(0.7);
        let body = DashScopeBackend::new()
            .build_request(&metadata, &request)
            .unwrap();

        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["input"]["messages"][0]["content"], "hi");
        assert_eq!(body["parameters"]["result_format"], "text");
        assert_eq!(body["parameters"]["incremental_output"], false);
        assert!(body["parameters"].get("max_tokens").is_none());
    }

    #[test]
    fn test_cumulative_text_becomes_deltas() {
        let mut parser = DashScopeParser::new("qwen");
        let deltas: Vec<Option<String>> = ["Hel", "Hello", "Hello", "Hello world"]
            .iter()
            .map(|t| parser.parse(&event(t, "null")).unwrap().content)
            .collect();
        assert_eq!(
            deltas,
            vec![
                Some("Hel".to_string()),
                Some("lo".to_string()),
                None,
                Some(" world".to_string())
            ]
        );

        let last = parser.parse(&event("Hello world!", "stop")).unwrap();
        assert_eq!(last.content.as_deref(), Some("!"));
        assert!(last.finished);
    }

    #[test]
    fn test_divergent_text_keeps_tail() {
        let mut parser = DashScopeParser::new("qwen");
        parser.parse(&event("Hello", "null")).unwrap();
        let parsed = parser.parse(&event("Hallo there", "null")).unwrap();
        assert_eq!(parsed.content.as_deref(), Some(" there"));
    }

    #[test]
    fn test_error_body() {
        let mut parser = DashScopeParser::new("qwen");
        let err = parser
            .parse(&SseEvent::new(
                r#"{"code":"InvalidApiKey","message":"Invalid API-key provided.","request_id":"r"}"#,
            ))
            .unwrap_err();
        assert!(err.to_string().contains("InvalidApiKey"));
    }
}
