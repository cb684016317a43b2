//! Per-request accumulation of streamed deltas into display text, reasoning trace and phase.

use std::time::{Duration, Instant};

use crate::provider::ParsedChunk;
use crate::render::render_markdown;
use crate::thinking::{self, ThinkingDetector};
use crate::types::{GenerationPhase, PhaseMetadata, ThinkingChain, ThinkingStep};
use crate::Error;

/// Something the caller should be told about after a chunk was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    Partial {
        rendered: String,
        meta: PhaseMetadata,
    },
    PhaseChanged {
        from: GenerationPhase,
        to: GenerationPhase,
    },
}

/// Final state of a stream that ended normally.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutput {
    /// Rendered display content, reasoning blocks removed.
    pub content: String,
    /// Everything the model produced on the content channel.
    pub raw_content: String,
    pub thinking: Option<ThinkingChain>,
    pub phase: GenerationPhase,
}

/// Mutable state of one in-flight request. Owned by that request's read loop only.
#[derive(Debug)]
pub struct StreamState {
    phase: GenerationPhase,
    raw: String,
    reasoning: String,
    /// The single consolidated reasoning step; it only ever grows by append.
    step: Option<ThinkingStep>,
    parse_failures: u32,
    max_parse_failures: u32,
    last_reasoning_at: Option<Instant>,
    idle_threshold: Duration,
    detector: ThinkingDetector,
    started: Instant,
}

impl StreamState {
    pub fn new(idle_threshold: Duration, max_parse_failures: u32) -> Self {
        Self::started_at(Instant::now(), idle_threshold, max_parse_failures)
    }

    pub fn started_at(started: Instant, idle_threshold: Duration, max_parse_failures: u32) -> Self {
        Self {
            phase: GenerationPhase::Initializing,
            raw: String::new(),
            reasoning: String::new(),
            step: None,
            parse_failures: 0,
            max_parse_failures,
            last_reasoning_at: None,
            idle_threshold,
            detector: ThinkingDetector::new(),
            started,
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn parse_failures(&self) -> u32 {
        self.parse_failures
    }

    /// Count one undecodable chunk. Fails once the consecutive count exceeds the limit.
    pub fn record_parse_failure(&mut self) -> Result<(), Error> {
        self.parse_failures += 1;
        if self.parse_failures > self.max_parse_failures {
            return Err(Error::ParseFailureExceeded(self.parse_failures));
        }
        Ok(())
    }

    pub fn reset_failures(&mut self) {
        self.parse_failures = 0;
    }

    /// Apply one parsed chunk received at `now`.
    pub fn apply(&mut self, chunk: ParsedChunk, now: Instant) -> Vec<StreamUpdate> {
        let mut updates = Vec::new();

        let content = chunk.content.filter(|c| !c.is_empty());
        let inline = content
            .as_deref()
            .and_then(|c| self.detector.detect_in_chunk(c));
        let reasoning = match (chunk.thinking.filter(|t| !t.is_empty()), inline) {
            (Some(dedicated), Some(inline)) => {
                tracing::debug!(
                    dropped_len = inline.len(),
                    "inline reasoning discarded, dedicated channel takes precedence"
                );
                Some(dedicated)
            }
            (dedicated, inline) => dedicated.or(inline),
        };

        if let Some(delta) = content.as_deref() {
            self.raw.push_str(delta);
            updates.push(self.partial());
        }

        match reasoning {
            Some(delta) => {
                if self.phase == GenerationPhase::Initializing {
                    self.transition(GenerationPhase::Thinking, &mut updates);
                }
                self.append_reasoning(&delta, now);
                updates.push(self.partial());
            }
            None => {
                if self.phase == GenerationPhase::Thinking && self.idle_elapsed(now) {
                    self.transition(GenerationPhase::Answering, &mut updates);
                }
            }
        }

        if self.phase == GenerationPhase::Initializing
            && content.is_some()
            && !thinking::display_text(&self.raw).trim().is_empty()
        {
            self.transition(GenerationPhase::Answering, &mut updates);
        }

        updates
    }

    /// Close the stream: move to `Completed` and recover any reasoning block the live
    /// pass never surfaced.
    pub fn finish(mut self) -> (Vec<StreamUpdate>, StreamOutput) {
        let mut updates = Vec::new();

        // A stream cut off inside an open block still owes the held-back tail.
        if let Some(tail) = self.detector.flush() {
            if self.phase == GenerationPhase::Initializing {
                self.transition(GenerationPhase::Thinking, &mut updates);
            }
            self.append_reasoning(&tail, Instant::now());
        }
        self.transition(GenerationPhase::Completed, &mut updates);

        let detection = thinking::detect_in_full_text(&self.raw);
        let display = if detection.found() {
            detection.answer.as_str()
        } else {
            self.raw.as_str()
        };
        let content = render_markdown(display);

        let thinking = match self.step.take() {
            Some(step) => Some(chain(step, thinking::count_steps(&self.reasoning).max(1))),
            None => detection.thinking().map(|text| {
                let updated_at_ms = self.elapsed_ms(Instant::now());
                let step = ThinkingStep {
                    index: 1,
                    content: text,
                    updated_at_ms,
                };
                chain(step, detection.step_count.max(1))
            }),
        };

        let output = StreamOutput {
            content,
            raw_content: self.raw,
            thinking,
            phase: self.phase,
        };
        (updates, output)
    }

    fn append_reasoning(&mut self, delta: &str, now: Instant) {
        self.reasoning.push_str(delta);
        let updated_at_ms = self.elapsed_ms(now);
        match &mut self.step {
            Some(step) => {
                step.content.push_str(delta);
                step.updated_at_ms = updated_at_ms;
            }
            None => {
                self.step = Some(ThinkingStep {
                    index: 1,
                    content: delta.to_string(),
                    updated_at_ms,
                });
            }
        }
        self.last_reasoning_at = Some(now);
    }

    fn idle_elapsed(&self, now: Instant) -> bool {
        self.step.is_some()
            && self
                .last_reasoning_at
                .is_some_and(|at| now.saturating_duration_since(at) > self.idle_threshold)
    }

    fn transition(&mut self, to: GenerationPhase, updates: &mut Vec<StreamUpdate>) {
        if to <= self.phase {
            return;
        }
        let from = self.phase;
        self.phase = to;
        tracing::debug!(from = %from, to = %to, "generation phase changed");
        updates.push(StreamUpdate::PhaseChanged { from, to });
    }

    fn partial(&self) -> StreamUpdate {
        StreamUpdate::Partial {
            rendered: render_markdown(&thinking::display_text(&self.raw)),
            meta: self.metadata(),
        }
    }

    fn metadata(&self) -> PhaseMetadata {
        PhaseMetadata {
            phase: self.phase,
            raw_len: self.raw.len(),
            thinking: self.step.clone().map(|step| ThinkingChain {
                summary: format!("thinking, {} characters so far", step.content.chars().count()),
                steps: vec![step],
                step_count: 1,
            }),
        }
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_millis() as u64
    }
}

fn chain(step: ThinkingStep, step_count: usize) -> ThinkingChain {
    ThinkingChain {
        steps: vec![step],
        summary: format!("completed in {step_count} steps"),
        step_count,
    }
}
