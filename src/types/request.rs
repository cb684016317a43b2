use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// A single generation request issued on behalf of a note.
///
/// Optional sampling fields left as `None` are omitted from the wire payload so the
/// backend's own defaults apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub note_id: String,
    pub prompt: String,
    /// Model id. Empty means the provider's default model.
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl GenerationRequest {
    /// Create a streaming request with backend-default sampling.
    pub fn new(
        note_id: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            stream: true,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask the backend for a single JSON body instead of an event stream.
    pub fn non_streaming(mut self) -> Self {
        self.stream = false;
        self
    }

    /// The conversation sent to chat-style backends: optional system message, then the prompt.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(self.prompt.clone()));
        messages
    }
}
