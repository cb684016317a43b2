use super::{load_fixture, sse_response, ExpectedOutput, ProviderConfig, ProviderTestSetup};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer};

pub struct QwenTestSetup;

const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

#[async_trait::async_trait]
impl ProviderTestSetup for QwenTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "qwen",
            model: "qwen-plus",
            api_key: "sk-qwentestabcdefghijklmnop".to_string(),
        }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{base_url}{GENERATION_PATH}")
    }

    async fn mount_generation_mocks(mock_server: &MockServer) {
        let auth = format!("Bearer {}", Self::get_config().api_key);
        Mock::given(method("POST"))
            .and(path(GENERATION_PATH))
            .and(header("authorization", auth.as_str()))
            .and(header("x-dashscope-sse", "enable"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen-plus",
                "parameters": { "incremental_output": false }
            })))
            .respond_with(sse_response(load_fixture("qwen/cumulative_stream.sse")))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn expected_output() -> ExpectedOutput {
        ExpectedOutput {
            raw_content: "Rust is a systems language.",
            rendered_contains: "<p>Rust is a systems language.</p>",
            thinking: None,
            step_count: 0,
        }
    }
}
