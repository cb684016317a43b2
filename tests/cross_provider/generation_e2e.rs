use std::sync::Arc;

use genstream::{
    ClientConfig, GenerationEvent, GenerationPhase, GenerationRequest, Registry,
    StaticCredentials,
};
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use super::common::{init_tracing, Recorder};
use super::providers::{
    anthropic::AnthropicTestSetup, deepseek::DeepSeekTestSetup, gemini::GeminiTestSetup,
    openrouter::OpenRouterTestSetup, qwen::QwenTestSetup, ProviderTestSetup,
};

async fn setup<T: ProviderTestSetup>() -> (MockServer, Registry) {
    init_tracing();
    let config = T::get_config();

    let mock_server = MockServer::start().await;
    T::mount_generation_mocks(&mock_server).await;

    let credentials = Arc::new(StaticCredentials::new().with_key(config.name, config.api_key));
    let registry = Registry::new(credentials, ClientConfig::default())
        .and_then(|r| r.with_endpoint(config.name, T::endpoint(&mock_server.uri())))
        .expect("registry");
    (mock_server, registry)
}

fn request<T: ProviderTestSetup>() -> GenerationRequest {
    GenerationRequest::new("note-e2e", "Answer the question.", T::get_config().model)
        .with_system_prompt("Answer tersely.")
}

/// Run one streaming generation through callbacks and check the processed result.
async fn run_generation_test<T: ProviderTestSetup>() {
    let config = T::get_config();
    let expected = T::expected_output();
    let (_mock_server, registry) = setup::<T>().await;

    let client = registry.load_provider(config.name).await.expect("load provider");
    let recorder = Recorder::default();
    let outcome = client
        .generate_content(&request::<T>(), &recorder, CancellationToken::new())
        .await
        .unwrap_or_else(|e| panic!("{} generation failed: {e}", config.name));

    let result = outcome.into_result().expect("not cancelled");
    assert_eq!(result.raw_content, expected.raw_content, "{}", config.name);
    assert!(
        result.content.contains(expected.rendered_contains),
        "{}: rendered {:?}",
        config.name,
        result.content
    );
    assert_eq!(result.phase, GenerationPhase::Completed);
    assert_eq!(result.provider, config.name);
    assert_eq!(result.model, config.model);

    match (expected.thinking, &result.thinking) {
        (Some(text), Some(chain)) => {
            assert_eq!(chain.steps.len(), 1, "{}", config.name);
            assert_eq!(chain.content(), text, "{}", config.name);
            assert_eq!(chain.step_count, expected.step_count);
            assert_eq!(
                chain.summary,
                format!("completed in {} steps", expected.step_count)
            );
        }
        (None, None) => {}
        (want, got) => panic!("{}: expected thinking {want:?}, got {got:?}", config.name),
    }

    // Partials only ever see the raw output grow.
    let lengths = recorder.raw_lengths();
    assert!(!lengths.is_empty(), "{}: no partials", config.name);
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]), "{lengths:?}");

    let phases = recorder.phases.lock().unwrap().clone();
    assert!(phases.iter().all(|(from, to)| from < to), "{phases:?}");
    assert_eq!(phases.last().map(|(_, to)| *to), Some(GenerationPhase::Completed));
    let first_target = if expected.thinking.is_some() {
        GenerationPhase::Thinking
    } else {
        GenerationPhase::Answering
    };
    assert_eq!(phases.first().map(|(_, to)| *to), Some(first_target));

    assert_eq!(recorder.completions(), 1);
    assert_eq!(recorder.error_count(), 0);
}

/// The same generation observed through the event stream instead of callbacks.
async fn run_event_stream_test<T: ProviderTestSetup>() {
    let config = T::get_config();
    let (_mock_server, registry) = setup::<T>().await;

    let client = registry.load_provider(config.name).await.expect("load provider");
    let mut stream = client.stream(request::<T>(), CancellationToken::new());

    let mut partials = 0;
    let mut terminal = None;
    while let Some(event) = futures_util::StreamExt::next(&mut stream).await {
        match event {
            GenerationEvent::Partial { .. } => partials += 1,
            GenerationEvent::PhaseChanged { .. } => {}
            other => terminal = Some(other),
        }
    }

    assert!(partials > 0);
    match terminal {
        Some(GenerationEvent::Completed(result)) => {
            assert_eq!(result.raw_content, T::expected_output().raw_content);
        }
        other => panic!("{}: unexpected terminal event {other:?}", config.name),
    }
}

#[tokio::test]
async fn test_deepseek_reasoning_channel() {
    run_generation_test::<DeepSeekTestSetup>().await;
}

#[tokio::test]
async fn test_anthropic_thinking_blocks() {
    run_generation_test::<AnthropicTestSetup>().await;
}

#[tokio::test]
async fn test_gemini_thought_parts() {
    run_generation_test::<GeminiTestSetup>().await;
}

#[tokio::test]
async fn test_qwen_cumulative_text() {
    run_generation_test::<QwenTestSetup>().await;
}

#[tokio::test]
async fn test_openrouter_inline_think_tags() {
    run_generation_test::<OpenRouterTestSetup>().await;
}

#[tokio::test]
async fn test_event_stream_across_providers() {
    run_event_stream_test::<DeepSeekTestSetup>().await;
    run_event_stream_test::<AnthropicTestSetup>().await;
    run_event_stream_test::<GeminiTestSetup>().await;
    run_event_stream_test::<QwenTestSetup>().await;
    run_event_stream_test::<OpenRouterTestSetup>().await;
}
