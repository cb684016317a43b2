pub mod anthropic;
pub mod deepseek;
pub mod gemini;
pub mod openrouter;
pub mod qwen;

use wiremock::MockServer;

/// Load a recorded stream from `tests/cross_provider/fixtures`.
pub fn load_fixture(path: &str) -> String {
    let full = format!("tests/cross_provider/fixtures/{path}");
    std::fs::read_to_string(&full).unwrap_or_else(|e| panic!("failed to read {full}: {e}"))
}

/// Provider configuration for cross-provider testing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: &'static str,
    pub model: &'static str,
    pub api_key: String,
}

/// What a provider's recorded stream must produce once processed.
#[derive(Debug, Clone)]
pub struct ExpectedOutput {
    pub raw_content: &'static str,
    /// Substring of the final rendered HTML.
    pub rendered_contains: &'static str,
    /// Concatenated reasoning, when the stream carries any.
    pub thinking: Option<&'static str>,
    pub step_count: usize,
}

/// Trait for provider-specific test setup
#[async_trait::async_trait]
pub trait ProviderTestSetup {
    fn get_config() -> ProviderConfig;

    /// Endpoint to register for the provider, given the mock server's base URI.
    fn endpoint(base_url: &str) -> String;

    /// Mount the mocks a streaming generation needs. Mocks match on the headers the
    /// backend requires, so a request missing them gets a 404.
    async fn mount_generation_mocks(mock_server: &MockServer);

    fn expected_output() -> ExpectedOutput;
}

pub fn sse_response(body: String) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}
