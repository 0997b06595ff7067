//! SSE wire format (spec §6): translates [`Event`]s from a workflow's
//! broadcast channel into `data: {json}\n\n` frames, with a `:\n\n` comment
//! line standing in for `Keepalive` events and a final `data: [DONE]\n\n`
//! once the stream reaches a terminal event kind.

use crate::cancellation::CancellationRegistry;
use crate::events::{Event, EventKind};
use axum::response::sse;
use futures_util::Stream;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Turn a per-workflow broadcast receiver into a stream of SSE events,
/// stopping right after the first `Done` or `Error` event. The background
/// run the receiver observes is not owned by this stream, so a dropped
/// client never corrupts workflow state (spec §4.12) — it just stops
/// reading events that keep happening regardless.
pub fn workflow_event_stream(
    rx: broadcast::Receiver<Event>,
) -> impl Stream<Item = Result<sse::Event, std::convert::Infallible>> {
    futures_util::stream::unfold((rx, false), |(mut rx, done)| async move {
        if done {
            return None;
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let terminal = matches!(event.kind, EventKind::Done | EventKind::Error);
                    let sse_event = to_sse_event(event);
                    return Some((Ok(sse_event), (rx, terminal)));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// Cancels a workflow's registered token when dropped while still "armed" —
/// i.e. before the stream it's embedded in ever saw a terminal event. This is
/// the hook spec §5/§8 scenario 6 relies on: hyper drops the response body
/// stream the instant a client disconnects mid-stream, which drops this guard
/// along with it, which is the only signal an `axum` SSE handler gets that
/// the caller went away.
pub struct CancelGuard {
    registry: Arc<CancellationRegistry>,
    workflow_id: String,
    armed: bool,
}

impl CancelGuard {
    pub fn new(registry: Arc<CancellationRegistry>, workflow_id: impl Into<String>) -> Self {
        Self {
            registry,
            workflow_id: workflow_id.into(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.registry.cancel(&self.workflow_id);
        }
    }
}

/// Same as [`workflow_event_stream`], but disarms and drops a [`CancelGuard`]
/// once a terminal event is observed, so only an actual mid-stream drop (a
/// client disconnect) ever triggers cancellation.
pub fn workflow_event_stream_with_cancel(
    rx: broadcast::Receiver<Event>,
    guard: CancelGuard,
) -> impl Stream<Item = Result<sse::Event, std::convert::Infallible>> {
    futures_util::stream::unfold((rx, guard, false), |(mut rx, mut guard, done)| async move {
        if done {
            guard.disarm();
            return None;
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let terminal = matches!(event.kind, EventKind::Done | EventKind::Error);
                    let sse_event = to_sse_event(event);
                    if terminal {
                        guard.disarm();
                    }
                    return Some((Ok(sse_event), (rx, guard, terminal)));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    guard.disarm();
                    return None;
                }
            }
        }
    })
}

fn to_sse_event(event: Event) -> sse::Event {
    if matches!(event.kind, EventKind::Keepalive) {
        return sse::Event::default().comment("keepalive");
    }
    let body = serde_json::json!({
        "event_id": event.event_id,
        "workflow_id": event.workflow_id,
        "kind": event.kind,
        "payload": event.payload,
        "timestamp": event.timestamp,
    });
    sse::Event::default().data(body.to_string())
}
