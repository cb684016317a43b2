//! Reasoning-trace detection for backends without a dedicated reasoning channel.
//!
//! Models served through plain chat endpoints often wrap their chain of thought in
//! tags such as `<think>...</think>`. Two entry points share the tag table below:
//!
//! * [`ThinkingDetector::detect_in_chunk`] runs live, one delta at a time. It only
//!   recognises blocks that open before any answer text, which is where reasoning
//!   models put them, and copes with tags split across chunks.
//! * [`detect_in_full_text`] runs once over the finished output and finds blocks
//!   anywhere. It is the fallback that recovers traces the live pass never saw.

use std::sync::LazyLock;

use regex::Regex;

/// Opening and closing markers of a reasoning block.
const TAG_PAIRS: &[(&str, &str)] = &[
    ("<think>", "</think>"),
    ("<thinking>", "</thinking>"),
    ("<reasoning>", "</reasoning>"),
    ("<thought>", "</thought>"),
];

/// Lines that start an explicit step: `1.`, `2)`, `Step 3:`.
static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:step[ \t]*\d+[ \t]*[:.)-]|\d+[.)][ \t])").expect("valid step regex")
});

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid paragraph regex"));

/// Result of scanning a complete response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FullTextDetection {
    /// The response with every reasoning block removed.
    pub answer: String,
    /// Contents of the reasoning blocks in document order.
    pub blocks: Vec<String>,
    pub step_count: usize,
}

impl FullTextDetection {
    pub fn found(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// All blocks joined into one trace.
    pub fn thinking(&self) -> Option<String> {
        self.found().then(|| self.blocks.join("\n\n"))
    }
}

/// Live detector state for one request.
#[derive(Debug, Default)]
pub struct ThinkingDetector {
    /// Index into [`TAG_PAIRS`] of the block currently open.
    open: Option<usize>,
    /// Tail of the previous chunk that may be the start of a tag.
    carry: String,
    /// Set once non-reasoning text has been seen; later tags are left to the fallback.
    answer_started: bool,
}

impl ThinkingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_block(&self) -> bool {
        self.open.is_some()
    }

    /// Returns the part of `chunk` that belongs to a reasoning block, if any.
    pub fn detect_in_chunk(&mut self, chunk: &str) -> Option<String> {
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(chunk);

        let mut reasoning = String::new();
        let mut rest = text.as_str();

        loop {
            if let Some(idx) = self.open {
                let close = TAG_PAIRS[idx].1;
                if let Some(pos) = rest.find(close) {
                    reasoning.push_str(&rest[..pos]);
                    rest = &rest[pos + close.len()..];
                    self.open = None;
                    continue;
                }
                let keep = partial_suffix_len(rest, [close]);
                let split = rest.len() - keep;
                reasoning.push_str(&rest[..split]);
                self.carry = rest[split..].to_string();
                break;
            }

            if self.answer_started {
                break;
            }

            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                break;
            }

            if let Some((idx, open)) = opening_tag_at_start(trimmed) {
                self.open = Some(idx);
                rest = &trimmed[open.len()..];
                continue;
            }

            if TAG_PAIRS
                .iter()
                .any(|(open, _)| open.len() > trimmed.len() && open.starts_with(trimmed))
            {
                self.carry = trimmed.to_string();
            } else {
                self.answer_started = true;
            }
            break;
        }

        (!reasoning.is_empty()).then_some(reasoning)
    }

    /// Release text held back as a possible closing tag once no more chunks will
    /// arrive. Only text inside an open block is reasoning; a held-back opening tag
    /// prefix is dropped.
    pub fn flush(&mut self) -> Option<String> {
        let carry = std::mem::take(&mut self.carry);
        (self.open.is_some() && !carry.is_empty()).then_some(carry)
    }
}

/// Scan a complete response for reasoning blocks anywhere in the text.
///
/// A block that is never closed runs to the end of the text.
pub fn detect_in_full_text(text: &str) -> FullTextDetection {
    let mut answer = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some((pos, idx)) = find_opening_tag(rest) {
        let (open, close) = TAG_PAIRS[idx];
        answer.push_str(&rest[..pos]);
        let inner = &rest[pos + open.len()..];
        match inner.find(close) {
            Some(end) => {
                blocks.push(inner[..end].trim().to_string());
                rest = &inner[end + close.len()..];
            }
            None => {
                blocks.push(inner.trim().to_string());
                rest = "";
            }
        }
    }
    answer.push_str(rest);

    if blocks.is_empty() {
        return FullTextDetection {
            answer,
            blocks,
            step_count: 0,
        };
    }

    let step_count = count_steps(&blocks.join("\n\n"));
    FullTextDetection {
        answer: answer.trim().to_string(),
        blocks,
        step_count,
    }
}

/// Text suitable for display while a response is still streaming: reasoning blocks
/// (including one still open) are removed, as is a trailing fragment that may be the
/// start of an opening tag.
pub fn display_text(raw: &str) -> String {
    let detection = detect_in_full_text(raw);
    let mut answer = detection.answer;
    let keep = partial_suffix_len(&answer, TAG_PAIRS.iter().map(|(open, _)| *open));
    answer.truncate(answer.len() - keep);
    answer
}

/// Number of logical steps in a reasoning trace.
///
/// Explicit markers (`1.`, `Step 2:`) win; otherwise each paragraph is a step.
pub fn count_steps(reasoning: &str) -> usize {
    if reasoning.trim().is_empty() {
        return 0;
    }
    let marked = STEP_MARKER.find_iter(reasoning).count();
    if marked > 0 {
        return marked;
    }
    PARAGRAPH_BREAK
        .split(reasoning)
        .filter(|p| !p.trim().is_empty())
        .count()
        .max(1)
}

fn opening_tag_at_start(text: &str) -> Option<(usize, &'static str)> {
    TAG_PAIRS
        .iter()
        .enumerate()
        .find(|(_, (open, _))| text.starts_with(open))
        .map(|(idx, (open, _))| (idx, *open))
}

fn find_opening_tag(text: &str) -> Option<(usize, usize)> {
    TAG_PAIRS
        .iter()
        .enumerate()
        .filter_map(|(idx, (open, _))| text.find(open).map(|pos| (pos, idx)))
        .min()
}

/// Length of the longest suffix of `text` that is a proper prefix of one of `tags`.
fn partial_suffix_len<'a>(text: &str, tags: impl IntoIterator<Item = &'a str>) -> usize {
    tags.into_iter()
        .flat_map(|tag| (1..tag.len()).rev().map(move |n| &tag[..n]))
        .filter(|prefix| text.ends_with(prefix))
        .map(str::len)
        .max()
        .unwrap_or(0)
}
