//! One provider client per backend id, shared by every request to that backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::accumulator::{StreamOutput, StreamState};
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::GenerationError;
use crate::processor::process_events;
use crate::provider::Backend;
use crate::response::{
    ChannelSink, GenerationCallbacks, GenerationEvent, GenerationOutcome, GenerationResult,
    GenerationStream,
};
use crate::sse_stream::{SseEvent, SseStreamExt};
use crate::{Error, GenerationRequest, ProviderMetadata};

/// Longest error body kept on [`Error::Http`].
const MAX_ERROR_BODY_CHARS: usize = 4096;

/// Issues generation requests against one backend.
///
/// Holds no per-request state; concurrent requests each get their own parser and
/// stream state.
pub struct ProviderClient {
    metadata: Arc<ProviderMetadata>,
    backend: Arc<dyn Backend>,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    config: ClientConfig,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.metadata.id)
            .field("endpoint", &self.metadata.endpoint)
            .field("wire_format", &self.metadata.wire_format)
            .finish()
    }
}

impl ProviderClient {
    pub fn new(
        metadata: Arc<ProviderMetadata>,
        backend: Arc<dyn Backend>,
        http: reqwest::Client,
        credentials: Arc<dyn CredentialStore>,
        config: ClientConfig,
    ) -> Self {
        Self {
            metadata,
            backend,
            http,
            credentials,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn request_timeout(&self) -> Duration {
        self.metadata
            .request_timeout
            .unwrap_or(self.config.request_timeout)
    }

    pub fn thinking_idle_threshold(&self) -> Duration {
        self.metadata
            .thinking_idle_threshold
            .unwrap_or(self.config.thinking_idle_threshold)
    }

    /// Run one request to completion, reporting progress through `callbacks`.
    ///
    /// Exactly one of `on_complete` or `on_error` is called unless `token` fires first,
    /// in which case neither is and [`GenerationOutcome::Cancelled`] is returned.
    pub async fn generate_content(
        &self,
        request: &GenerationRequest,
        callbacks: &dyn GenerationCallbacks,
        token: CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut request = request.clone();
        if request.model.trim().is_empty() {
            request.model = self.metadata.default_model.clone();
        }
        let request_id = Uuid::new_v4().to_string();

        let span = tracing::info_span!(
            "generate",
            provider = %self.metadata.id,
            model = %request.model,
            note_id = %request.note_id,
            request_id = %request_id,
        );

        self.run(request, callbacks, token, request_id)
            .instrument(span)
            .await
    }

    /// Run one request on a spawned task and observe it as a stream of events.
    ///
    /// Dropping the returned stream cancels the request.
    pub fn stream(
        self: &Arc<Self>,
        request: GenerationRequest,
        token: CancellationToken,
    ) -> GenerationStream {
        self.spawn_stream(request, token).0
    }

    /// The task resolves to whether a terminal event was sent.
    fn spawn_stream(
        self: &Arc<Self>,
        request: GenerationRequest,
        token: CancellationToken,
    ) -> (GenerationStream, JoinHandle<bool>) {
        let token = token.child_token();
        let task_token = token.clone();
        let (sender, stream) = GenerationStream::channel(token.drop_guard());
        let client = Arc::clone(self);

        let task = tokio::spawn(async move {
            let sink = ChannelSink::new(&sender);
            let terminal = match client.generate_content(&request, &sink, task_token).await {
                Ok(GenerationOutcome::Completed(result)) => Some(GenerationEvent::Completed(result)),
                Ok(GenerationOutcome::Cancelled) => None,
                Err(error) => Some(GenerationEvent::Failed(error)),
            };
            let delivered = terminal.is_some();
            if let Some(event) = terminal {
                sender.send(event);
            }
            delivered
        });

        (stream, task)
    }

    async fn run(
        &self,
        request: GenerationRequest,
        callbacks: &dyn GenerationCallbacks,
        caller_token: CancellationToken,
        request_id: String,
    ) -> Result<GenerationOutcome, GenerationError> {
        let started = Instant::now();
        let timeout = self.request_timeout();
        // The deadline cancels only this exchange, never the caller's token.
        let token = caller_token.child_token();

        let exchange = self.exchange(&request, callbacks, &token, started);
        let result = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                Err(Error::Timeout(timeout))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            _ if caller_token.is_cancelled() => {
                tracing::info!(elapsed_ms, "generation cancelled");
                Ok(GenerationOutcome::Cancelled)
            }
            Ok(output) => {
                let result = self.into_result(output, &request, request_id, elapsed_ms);
                tracing::info!(
                    elapsed_ms,
                    raw_len = result.raw_content.len(),
                    thinking = result.thinking.is_some(),
                    "generation completed"
                );
                callbacks.on_complete(&result.content, &result);
                Ok(GenerationOutcome::Completed(result))
            }
            Err(Error::Cancelled) => {
                tracing::info!(elapsed_ms, "generation cancelled");
                Ok(GenerationOutcome::Cancelled)
            }
            Err(error) => {
                let error =
                    GenerationError::new(&self.metadata.id, &request.model, &request.prompt, error);
                tracing::warn!(
                    elapsed_ms,
                    retryable = error.is_retryable(),
                    error = %error.source,
                    "generation failed"
                );
                callbacks.on_error(&error);
                Err(error)
            }
        }
    }

    async fn exchange(
        &self,
        request: &GenerationRequest,
        callbacks: &dyn GenerationCallbacks,
        token: &CancellationToken,
        started: Instant,
    ) -> Result<StreamOutput, Error> {
        if !self.metadata.supports_model(&request.model) {
            return Err(Error::UnsupportedModel {
                provider: self.metadata.id.clone(),
                model: request.model.clone(),
            });
        }

        let api_key = self
            .credentials
            .get_key(&self.metadata.id)
            .await
            .ok_or_else(|| Error::CredentialMissing(self.metadata.id.clone()))?;

        let streaming = request.stream && self.metadata.supports_streaming;
        let request = if streaming == request.stream {
            request.clone()
        } else {
            request.clone().non_streaming()
        };

        let url = self.backend.endpoint(&self.metadata, &request);
        let body = self.backend.build_request(&self.metadata, &request)?;
        let builder = self.http.post(&url).json(&body);
        let builder = self.backend.authorize(builder, &api_key, &request);

        tracing::debug!(%url, streaming, "sending request");
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            response = builder.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Cancelled),
                body = response.text() => body.unwrap_or_default(),
            };
            return Err(Error::Http {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let mut parser = self.backend.new_parser(&self.metadata);
        let state = StreamState::started_at(
            started,
            self.thinking_idle_threshold(),
            self.config.max_parse_failures,
        );

        if streaming {
            let events = Box::pin(response.bytes_stream()).sse_events();
            process_events(events, parser.as_mut(), state, callbacks, token).await
        } else {
            let text = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Cancelled),
                text = response.text() => text?,
            };
            let events = futures_util::stream::iter([Ok(SseEvent::new(text))]);
            process_events(events, parser.as_mut(), state, callbacks, token).await
        }
    }

    fn into_result(
        &self,
        output: StreamOutput,
        request: &GenerationRequest,
        request_id: String,
        elapsed_ms: u64,
    ) -> GenerationResult {
        GenerationResult {
            content: output.content,
            raw_content: output.raw_content,
            thinking: output.thinking,
            phase: output.phase,
            provider: self.metadata.id.clone(),
            model: request.model.clone(),
            request_id,
            elapsed_ms,
        }
    }
}

fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => body[..cut].to_string(),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::Registry;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn openai_client(uri: &str) -> Arc<ProviderClient> {
        let credentials =
            StaticCredentials::new().with_key("openai", "sk-openaitestabcdefghijklmnop");
        Registry::new(Arc::new(credentials), ClientConfig::default())
            .unwrap()
            .with_endpoint("openai", format!("{uri}/v1/chat/completions"))
            .unwrap()
            .load_provider("openai")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_the_request_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: [DONE]\n\n")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let client = openai_client(&server.uri()).await;

        let caller = CancellationToken::new();
        let (stream, task) =
            client.spawn_stream(GenerationRequest::new("n", "Hi", "gpt-4o"), caller.clone());
        tokio::task::yield_now().await;
        drop(stream);

        let delivered = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("request task should end soon after the stream is dropped")
            .unwrap();
        assert!(!delivered);
        assert!(!caller.is_cancelled());
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short".into()), "short");
        let long = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        assert_eq!(truncate_body(long).chars().count(), MAX_ERROR_BODY_CHARS);
    }
}
