#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use genstream::{
    ClientConfig, GenerationCallbacks, GenerationError, GenerationPhase, GenerationResult,
    PhaseMetadata, Registry, StaticCredentials,
};
use tokio_util::sync::CancellationToken;

pub const OPENAI_KEY: &str = "sk-test-abcdefghijklmnopqrstuvwxyz";

/// Callbacks that record everything they receive.
#[derive(Default)]
pub struct Recorder {
    pub partials: Mutex<Vec<(String, PhaseMetadata)>>,
    pub phases: Mutex<Vec<(GenerationPhase, GenerationPhase)>>,
    pub completed: Mutex<Vec<(String, GenerationResult)>>,
    pub errors: Mutex<Vec<String>>,
    /// Cancel this token once the given number of partials has been seen.
    pub cancel_after: Option<(usize, CancellationToken)>,
}

impl Recorder {
    pub fn cancelling(after: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((after, token)),
            ..Self::default()
        }
    }

    pub fn partial_texts(&self) -> Vec<String> {
        self.partials
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn raw_lengths(&self) -> Vec<usize> {
        self.partials
            .lock()
            .unwrap()
            .iter()
            .map(|(_, meta)| meta.raw_len)
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl GenerationCallbacks for Recorder {
    fn on_partial(&self, rendered: &str, meta: &PhaseMetadata) {
        let mut partials = self.partials.lock().unwrap();
        partials.push((rendered.to_string(), meta.clone()));
        if let Some((after, token)) = &self.cancel_after {
            if partials.len() >= *after {
                token.cancel();
            }
        }
    }

    fn on_phase_change(&self, from: GenerationPhase, to: GenerationPhase) {
        self.phases.lock().unwrap().push((from, to));
    }

    fn on_complete(&self, rendered: &str, result: &GenerationResult) {
        self.completed
            .lock()
            .unwrap()
            .push((rendered.to_string(), result.clone()));
    }

    fn on_error(&self, error: &GenerationError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Credentials for every built-in provider, in the format each one expects.
pub fn credentials() -> Arc<StaticCredentials> {
    Arc::new(
        StaticCredentials::new()
            .with_key("openai", OPENAI_KEY)
            .with_key("deepseek", format!("sk-{}", "d".repeat(32)))
            .with_key("anthropic", "sk-ant-REDACTED")
            .with_key("gemini", format!("AIza{}", "g".repeat(35)))
            .with_key("qwen", "sk-qwentestabcdefghijklmnop")
            .with_key("custom-mock", "local-key"),
    )
}

/// Registry whose built-in providers all point at `server_uri`.
pub fn mock_registry(server_uri: &str, config: ClientConfig) -> Registry {
    Registry::new(credentials(), config)
        .and_then(|r| r.with_endpoint("openai", format!("{server_uri}/v1/chat/completions")))
        .and_then(|r| r.with_endpoint("deepseek", format!("{server_uri}/chat/completions")))
        .and_then(|r| r.with_endpoint("anthropic", format!("{server_uri}/v1/messages")))
        .and_then(|r| r.with_endpoint("gemini", format!("{server_uri}/v1beta/models")))
        .and_then(|r| {
            r.with_endpoint(
                "qwen",
                format!("{server_uri}/api/v1/services/aigc/text-generation/generation"),
            )
        })
        .expect("mock registry")
}

/// Frame JSON payloads as an SSE body.
pub fn sse_body(events: &[&str]) -> String {
    events
        .iter()
        .map(|data| format!("data: {data}\n\n"))
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
