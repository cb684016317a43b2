use super::{load_fixture, sse_response, ExpectedOutput, ProviderConfig, ProviderTestSetup};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer};

pub struct AnthropicTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for AnthropicTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "anthropic",
            model: "claude-3-7-sonnet-20250219",
            api_key: "sk-ant-REDACTED".to_string(),
        }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{base_url}/v1/messages")
    }

    async fn mount_generation_mocks(mock_server: &MockServer) {
        let config = Self::get_config();
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", config.api_key.as_str()))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "model": config.model,
                "stream": true,
                "system": "Answer tersely."
            })))
            .respond_with(sse_response(load_fixture("anthropic/thinking_stream.sse")))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn expected_output() -> ExpectedOutput {
        ExpectedOutput {
            raw_content: "The answer is **4**.",
            rendered_contains: "<strong>4</strong>",
            thinking: Some("Two plus two is four."),
            step_count: 1,
        }
    }
}
