use super::{load_fixture, sse_response, ExpectedOutput, ProviderConfig, ProviderTestSetup};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer};

pub struct GeminiTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for GeminiTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "gemini",
            model: "gemini-2.5-flash",
            api_key: format!("AIza{}", "g".repeat(35)),
        }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{base_url}/v1beta/models")
    }

    async fn mount_generation_mocks(mock_server: &MockServer) {
        let config = Self::get_config();
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", config.api_key.as_str()))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "Answer tersely." }] },
                "generationConfig": { "thinkingConfig": { "includeThoughts": true } }
            })))
            .respond_with(sse_response(load_fixture("gemini/thought_stream.sse")))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn expected_output() -> ExpectedOutput {
        ExpectedOutput {
            raw_content: "Option A is cheaper.",
            rendered_contains: "<p>Option A is cheaper.</p>",
            thinking: Some("Comparing both options on cost."),
            step_count: 1,
        }
    }
}
