//! The read/parse/accumulate/callback loop run for every request.

use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::accumulator::{StreamOutput, StreamState, StreamUpdate};
use crate::provider::ResponseParser;
use crate::response::GenerationCallbacks;
use crate::sse_stream::SseEvent;
use crate::Error;

/// Drive `events` to completion, reporting progress through `callbacks`.
///
/// Returns [`Error::Cancelled`] as soon as `token` fires; no callback is made after
/// that point. Terminal callbacks are left to the caller.
pub async fn process_events<S>(
    mut events: S,
    parser: &mut dyn ResponseParser,
    mut state: StreamState,
    callbacks: &dyn GenerationCallbacks,
    token: &CancellationToken,
) -> Result<StreamOutput, Error>
where
    S: Stream<Item = Result<SseEvent, Error>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            next = events.next() => next,
        };

        let Some(item) = next else {
            break;
        };

        let event = match item {
            Ok(event) => event,
            Err(Error::MalformedChunk(reason)) => {
                tracing::warn!(%reason, "skipping undecodable chunk");
                state.record_parse_failure()?;
                continue;
            }
            Err(e) => return Err(e),
        };

        if parser.is_done(&event) {
            tracing::debug!("termination sentinel received");
            break;
        }

        let chunk = match parser.parse(&event) {
            Ok(chunk) => {
                state.reset_failures();
                chunk
            }
            Err(Error::MalformedChunk(reason)) => {
                tracing::warn!(
                    %reason,
                    failures = state.parse_failures() + 1,
                    "failed to parse stream chunk"
                );
                state.record_parse_failure()?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let finished = chunk.finished;
        for update in state.apply(chunk, Instant::now()) {
            dispatch(update, callbacks, token)?;
        }

        if finished {
            tracing::debug!("finish reason received");
            break;
        }
    }

    let (updates, output) = state.finish();
    for update in updates {
        dispatch(update, callbacks, token)?;
    }
    Ok(output)
}

fn dispatch(
    update: StreamUpdate,
    callbacks: &dyn GenerationCallbacks,
    token: &CancellationToken,
) -> Result<(), Error> {
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    match update {
        StreamUpdate::Partial { rendered, meta } => callbacks.on_partial(&rendered, &meta),
        StreamUpdate::PhaseChanged { from, to } => callbacks.on_phase_change(from, to),
    }
    Ok(())
}
