use super::{load_fixture, sse_response, ExpectedOutput, ProviderConfig, ProviderTestSetup};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer};

pub struct DeepSeekTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for DeepSeekTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "deepseek",
            model: "deepseek-reasoner",
            api_key: format!("sk-{}", "d".repeat(32)),
        }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{base_url}/chat/completions")
    }

    async fn mount_generation_mocks(mock_server: &MockServer) {
        let auth = format!("Bearer {}", Self::get_config().api_key);
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", auth.as_str()))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-reasoner",
                "stream": true
            })))
            .respond_with(sse_response(load_fixture("deepseek/reasoning_stream.sse")))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn expected_output() -> ExpectedOutput {
        ExpectedOutput {
            raw_content: "Hi there!",
            rendered_contains: "<p>Hi there!</p>",
            thinking: Some("The user greets me. A short, friendly reply fits."),
            step_count: 1,
        }
    }
}
