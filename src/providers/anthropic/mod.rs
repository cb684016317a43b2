//! Anthropic Messages API.

mod backend;
pub mod types;

pub use backend::{AnthropicBackend, AnthropicParser, ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS};
