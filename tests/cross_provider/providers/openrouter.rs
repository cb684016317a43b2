use super::{load_fixture, sse_response, ExpectedOutput, ProviderConfig, ProviderTestSetup};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

/// A reasoning model served through a plain chat endpoint, with its trace inline.
pub struct OpenRouterTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for OpenRouterTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "openrouter",
            model: "deepseek/deepseek-r1",
            api_key: "sk-or-v1-abcdefghijklmnopqrstuvwxyz".to_string(),
        }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{base_url}/api/v1/chat/completions")
    }

    async fn mount_generation_mocks(mock_server: &MockServer) {
        let auth = format!("Bearer {}", Self::get_config().api_key);
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", auth.as_str()))
            .respond_with(sse_response(load_fixture("openrouter/inline_think_stream.sse")))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn expected_output() -> ExpectedOutput {
        ExpectedOutput {
            raw_content: "<think>Step 1: read the note\nStep 2: summarise it</think>\n\n- first point\n- second point",
            rendered_contains: "<li>first point</li>",
            thinking: Some("Step 1: read the note\nStep 2: summarise it"),
            step_count: 2,
        }
    }
}
