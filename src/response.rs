//! Results of a generation and the two ways of observing one: callbacks and an event stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::task::AtomicWaker;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::DropGuard;

use crate::error::GenerationError;
use crate::types::{GenerationPhase, PhaseMetadata, ThinkingChain};

/// The finished product of one successful request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Display-ready HTML with reasoning blocks removed.
    pub content: String,
    /// Unmodified model output from the content channel.
    pub raw_content: String,
    pub thinking: Option<ThinkingChain>,
    pub phase: GenerationPhase,
    pub provider: String,
    pub model: String,
    pub request_id: String,
    pub elapsed_ms: u64,
}

/// How a request ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(GenerationResult),
    /// The caller's token fired. No terminal callback was delivered.
    Cancelled,
}

impl GenerationOutcome {
    pub fn into_result(self) -> Option<GenerationResult> {
        match self {
            GenerationOutcome::Completed(result) => Some(result),
            GenerationOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationOutcome::Cancelled)
    }
}

/// Receiver of progress for one request.
///
/// Calls for one request arrive in chunk order from the task running the request.
/// After cancellation neither `on_complete` nor `on_error` is called.
pub trait GenerationCallbacks: Send + Sync {
    /// Rendered display content so far, with current phase metadata.
    fn on_partial(&self, rendered: &str, meta: &PhaseMetadata);

    fn on_phase_change(&self, _from: GenerationPhase, _to: GenerationPhase) {}

    fn on_complete(&self, rendered: &str, result: &GenerationResult);

    fn on_error(&self, error: &GenerationError);
}

/// One item of a [`GenerationStream`].
#[derive(Debug)]
pub enum GenerationEvent {
    Partial {
        rendered: String,
        meta: PhaseMetadata,
    },
    PhaseChanged {
        from: GenerationPhase,
        to: GenerationPhase,
    },
    /// Terminal.
    Completed(GenerationResult),
    /// Terminal.
    Failed(GenerationError),
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Completed(_) | GenerationEvent::Failed(_)
        )
    }
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<GenerationEvent>,
    closed: bool,
}

/// Events not yet taken by the consumer.
///
/// A partial replaces an undelivered partial directly before it, so a slow consumer
/// holds at most one snapshot per phase instead of every intermediate render.
#[derive(Debug, Default)]
struct EventQueue {
    state: Mutex<QueueState>,
    waker: AtomicWaker,
}

impl EventQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Producer half of a [`GenerationStream`]. Dropping it ends the stream.
#[derive(Debug)]
pub(crate) struct EventSender {
    queue: Arc<EventQueue>,
}

impl EventSender {
    pub(crate) fn send(&self, event: GenerationEvent) {
        {
            let mut state = self.queue.lock();
            let supersedes = matches!(event, GenerationEvent::Partial { .. })
                && matches!(state.events.back(), Some(GenerationEvent::Partial { .. }));
            if supersedes {
                state.events.pop_back();
            }
            state.events.push_back(event);
        }
        self.queue.waker.wake();
    }
}

impl Drop for EventSender {
    fn drop(&mut self) {
        self.queue.lock().closed = true;
        self.queue.waker.wake();
    }
}

/// A lazy, finite, non-restartable sequence of events for one request.
///
/// The stream ends after a terminal event, or without one if the request was
/// cancelled. Dropping the stream cancels the request. Partials the consumer has not
/// yet taken are coalesced into the latest one; phase changes and the terminal event
/// are never dropped.
pub struct GenerationStream {
    queue: Arc<EventQueue>,
    _cancel_on_drop: DropGuard,
}

impl GenerationStream {
    pub(crate) fn channel(guard: DropGuard) -> (EventSender, Self) {
        let queue = Arc::new(EventQueue::default());
        let sender = EventSender {
            queue: Arc::clone(&queue),
        };
        let stream = Self {
            queue,
            _cancel_on_drop: guard,
        };
        (sender, stream)
    }

    /// Drain the stream and return how the request ended.
    pub async fn buffer(mut self) -> Result<GenerationOutcome, GenerationError> {
        while let Some(event) = self.next().await {
            match event {
                GenerationEvent::Completed(result) => {
                    return Ok(GenerationOutcome::Completed(result))
                }
                GenerationEvent::Failed(error) => return Err(error),
                GenerationEvent::Partial { .. } | GenerationEvent::PhaseChanged { .. } => {}
            }
        }
        Ok(GenerationOutcome::Cancelled)
    }
}

impl Stream for GenerationStream {
    type Item = GenerationEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Register first so a send between the check and returning Pending still wakes us.
        self.queue.waker.register(cx.waker());
        let mut state = self.queue.lock();
        match state.events.pop_front() {
            Some(event) => Poll::Ready(Some(event)),
            None if state.closed => Poll::Ready(None),
            None => Poll::Pending,
        }
    }
}

/// Forwards non-terminal callbacks into a [`GenerationStream`].
pub(crate) struct ChannelSink<'a> {
    sender: &'a EventSender,
}

impl<'a> ChannelSink<'a> {
    pub(crate) fn new(sender: &'a EventSender) -> Self {
        Self { sender }
    }

    fn send(&self, event: GenerationEvent) {
        self.sender.send(event);
    }
}

impl GenerationCallbacks for ChannelSink<'_> {
    fn on_partial(&self, rendered: &str, meta: &PhaseMetadata) {
        self.send(GenerationEvent::Partial {
            rendered: rendered.to_string(),
            meta: meta.clone(),
        });
    }

    fn on_phase_change(&self, from: GenerationPhase, to: GenerationPhase) {
        self.send(GenerationEvent::PhaseChanged { from, to });
    }

    // Terminal events are sent from the request's return value instead.
    fn on_complete(&self, _rendered: &str, _result: &GenerationResult) {}

    fn on_error(&self, _error: &GenerationError) {}
}
