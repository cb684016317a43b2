//! Wire-format backends for the supported provider families.

use std::sync::Arc;

use crate::provider::Backend;
use crate::types::WireFormat;

pub mod anthropic;
pub mod dashscope;
pub mod gemini;
pub mod openai;

// Re-export commonly used provider types
pub use anthropic::AnthropicBackend;
pub use dashscope::DashScopeBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAICompatibleBackend;

/// The backend implementing a wire format.
pub fn backend_for(format: WireFormat) -> Arc<dyn Backend> {
    match format {
        WireFormat::OpenAiCompatible => Arc::new(OpenAICompatibleBackend::new()),
        WireFormat::Anthropic => Arc::new(AnthropicBackend::new()),
        WireFormat::Gemini => Arc::new(GeminiBackend::new()),
        WireFormat::DashScope => Arc::new(DashScopeBackend::new()),
    }
}
