//! OpenAI-compatible chat completions (OpenAI, DeepSeek, Moonshot, OpenRouter, custom).

mod backend;
pub mod types;

pub use backend::{OpenAICompatibleBackend, OpenAICompatibleParser};
