//! Line-oriented Server-Sent Events decoding over a byte stream.
//!
//! Backends frame their output differently: OpenAI-style servers send bare `data:`
//! lines, Anthropic adds `event:` names, DashScope adds `id:` lines and
//! `:HTTP_STATUS/200` comments. All of them reduce to the same field grammar, so one
//! decoder serves every wire format.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};

use crate::Error;

/// Largest event (including its unterminated tail) held in memory.
const MAX_EVENT_BYTES: usize = 1_000_000;

/// One dispatched event. Multi-line `data` fields are joined with `\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// Value of the `event:` field, e.g. `content_block_delta`.
    pub event_type: Option<String>,
    pub data: String,
    pub id: Option<String>,
    /// Reconnection hint in milliseconds. Parsed but not acted on.
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    pub fn with_type(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..Self::new(data)
        }
    }

    /// The `[DONE]` sentinel of OpenAI-compatible streams.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Fields collected since the last blank line.
#[derive(Debug, Default)]
struct PendingEvent {
    event_type: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<u64>,
    invalid: Option<std::str::Utf8Error>,
    bytes: usize,
}

impl PendingEvent {
    fn feed(&mut self, line: &[u8]) {
        self.bytes += line.len();
        let line = match std::str::from_utf8(line) {
            Ok(line) => line,
            Err(e) => {
                self.invalid.get_or_insert(e);
                return;
            }
        };
        let line = line.strip_prefix('\u{FEFF}').unwrap_or(line);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => self.retry = value.trim().parse().ok(),
            _ => {}
        }
    }

    /// Finish the event at a blank line. Events without data are dropped.
    fn dispatch(&mut self) -> Option<Result<SseEvent, Error>> {
        let pending = std::mem::take(self);
        if let Some(e) = pending.invalid {
            return Some(Err(Error::malformed(format!(
                "invalid UTF-8 in SSE event: {e}"
            ))));
        }
        if pending.data.is_empty() {
            return None;
        }
        Some(Ok(SseEvent {
            event_type: pending.event_type,
            data: pending.data.join("\n"),
            id: pending.id,
            retry: pending.retry,
        }))
    }
}

/// Decodes a byte stream into [`SseEvent`]s.
///
/// Events and UTF-8 sequences may be split across chunks arbitrarily. An event that
/// is not valid UTF-8 is yielded as [`Error::MalformedChunk`] and decoding continues
/// with the next one; a failing byte stream ends in [`Error::Streaming`].
pub struct SseStream<S> {
    inner: S,
    /// Bytes of the current line, not yet terminated by `\n`.
    line: Vec<u8>,
    pending: PendingEvent,
    ready: VecDeque<Result<SseEvent, Error>>,
    exhausted: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            line: Vec::new(),
            pending: PendingEvent::default(),
            ready: VecDeque::new(),
            exhausted: false,
        }
    }

    fn ingest(&mut self, mut chunk: &[u8]) -> Result<(), Error> {
        while let Some(pos) = memchr::memchr(b'\n', chunk) {
            self.line.extend_from_slice(&chunk[..pos]);
            self.end_line();
            chunk = &chunk[pos + 1..];
        }
        self.line.extend_from_slice(chunk);

        if self.line.len() + self.pending.bytes > MAX_EVENT_BYTES {
            self.line.clear();
            self.pending = PendingEvent::default();
            return Err(Error::streaming(format!(
                "SSE event exceeds {MAX_EVENT_BYTES} bytes"
            )));
        }
        Ok(())
    }

    fn end_line(&mut self) {
        let mut line = std::mem::take(&mut self.line);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            if let Some(event) = self.pending.dispatch() {
                self.ready.push_back(event);
            }
        } else {
            self.pending.feed(&line);
        }
    }

    /// The last event of a body often lacks its trailing blank line.
    fn flush(&mut self) {
        if !self.line.is_empty() {
            self.end_line();
        }
        if let Some(event) = self.pending.dispatch() {
            self.ready.push_back(event);
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<SseEvent, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.exhausted {
                return Poll::Ready(None);
            }

            match ready!(this.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    if let Err(e) = this.ingest(&chunk) {
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "response body failed: {}",
                        e.into()
                    )))));
                }
                None => {
                    this.exhausted = true;
                    this.flush();
                }
            }
        }
    }
}

/// Adds [`sse_events`](SseStreamExt::sse_events) to byte streams.
pub trait SseStreamExt: Stream {
    fn sse_events(self) -> SseStream<Self>
    where
        Self: Sized,
    {
        SseStream::new(self)
    }
}

impl<S: Stream> SseStreamExt for S {}
