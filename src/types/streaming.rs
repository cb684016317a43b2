//! Types for streaming responses.

use serde::{Deserialize, Serialize};

/// Generation phase of a single request. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Initializing,
    Thinking,
    Answering,
    Completed,
}

impl GenerationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPhase::Initializing => "initializing",
            GenerationPhase::Thinking => "thinking",
            GenerationPhase::Answering => "answering",
            GenerationPhase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStep {
    /// 1-based position in the chain.
    pub index: usize,
    pub content: String,
    /// Milliseconds since the request started when the step was last extended.
    pub updated_at_ms: u64,
}

/// A reasoning trace exposed by the model or recovered from its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingChain {
    pub steps: Vec<ThinkingStep>,
    pub summary: String,
    pub step_count: usize,
}

impl ThinkingChain {
    /// Concatenated content of all steps.
    pub fn content(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Progress information attached to every partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMetadata {
    pub phase: GenerationPhase,
    /// Length in bytes of the raw accumulated model output.
    pub raw_len: usize,
    pub thinking: Option<ThinkingChain>,
}
