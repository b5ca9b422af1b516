//! Server-sent-event channel.
//!
//! An [`SseChannel`] is the per-session conduit between one HTTP client and
//! the protocol engine:
//!
//! - outbound: [`SseChannel::send`] pushes `message` events onto the
//!   long-lived SSE response ([`EventStream`]);
//! - inbound: [`SseChannel::handle_post`] accepts a posted JSON message and
//!   queues it for the engine, which drains it via
//!   [`SseChannel::take_incoming`].
//!
//! The channel closes when the client drops the SSE response or when
//! [`SseChannel::close`] is called. Closure hooks run exactly once, in the
//! order they were installed.

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::{header, StatusCode},
    response::{sse::Event, IntoResponse, Response},
};
use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

use crate::error::BridgeError;
use crate::session::SessionId;
use crate::Result;

/// Callback run when a channel closes.
type CloseHook = Box<dyn FnOnce(&SessionId) + Send>;

/// Handle to one open SSE session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SseChannel {
    inner: Arc<Inner>,
}

struct Inner {
    id: SessionId,
    endpoint: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    started: AtomicBool,
    closed: AtomicBool,
    hooks: Mutex<Vec<CloseHook>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

impl SseChannel {
    /// Open a new channel whose clients post messages under `message_path`.
    ///
    /// Returns the channel and the event stream that becomes the body of the
    /// SSE response. Dropping the stream closes the channel.
    pub fn open(message_path: &str) -> (Self, EventStream) {
        let id = SessionId::generate();
        let endpoint = format!("{}?sessionId={}", message_path, id);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let channel = Self {
            inner: Arc::new(Inner {
                id,
                endpoint,
                outbound: Mutex::new(Some(out_tx)),
                inbound_tx: Mutex::new(Some(in_tx)),
                inbound_rx: Mutex::new(Some(in_rx)),
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                hooks: Mutex::new(Vec::new()),
            }),
        };

        let stream = EventStream {
            events: UnboundedReceiverStream::new(out_rx),
            _guard: CloseOnDrop(channel.clone()),
        };

        (channel, stream)
    }

    /// The session ID minted for this channel.
    pub fn session_id(&self) -> &SessionId {
        &self.inner.id
    }

    /// URL the client must post messages to.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Whether the channel has closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Begin streaming by announcing the message endpoint to the client.
    pub fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(BridgeError::AlreadyStarted);
        }
        self.emit(Event::default().event("endpoint").data(self.endpoint()))
    }

    /// Push a protocol message to the client.
    pub fn send(&self, message: &Value) -> Result<()> {
        let data = serde_json::to_string(message)?;
        trace!(session_id = %self.inner.id, "sending message");
        self.emit(Event::default().event("message").data(data))
    }

    fn emit(&self, event: Event) -> Result<()> {
        match lock(&self.inner.outbound).as_ref() {
            Some(tx) => tx.send(event).map_err(|_| BridgeError::ChannelClosed),
            None => Err(BridgeError::ChannelClosed),
        }
    }

    /// Hand the inbound message queue to a protocol engine.
    ///
    /// Returns `None` once the queue has been taken.
    pub fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        lock(&self.inner.inbound_rx).take()
    }

    /// Accept one posted message.
    ///
    /// The body must be `application/json` and at most `max_bytes` long.
    /// On success the message is queued for the engine and the client gets
    /// `202 Accepted`. Messages posted before an engine attaches wait in the
    /// queue.
    pub async fn handle_post(&self, request: Request, max_bytes: usize) -> Result<Response> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !is_json(&content_type) {
            return Err(BridgeError::UnsupportedContentType(content_type));
        }

        let body = axum::body::to_bytes(request.into_body(), max_bytes)
            .await
            .map_err(|e| BridgeError::BodyRead(e.to_string()))?;
        let message: Value = serde_json::from_slice(&body)?;

        let queued = lock(&self.inner.inbound_tx)
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok());
        if !queued {
            return Err(BridgeError::ChannelClosed);
        }

        Ok((StatusCode::ACCEPTED, "Accepted").into_response())
    }

    /// Install a closure hook.
    ///
    /// Hooks run in installation order. A hook installed after the channel
    /// closed runs immediately.
    pub fn on_close<F>(&self, hook: F)
    where
        F: FnOnce(&SessionId) + Send + 'static,
    {
        let mut hooks = lock(&self.inner.hooks);
        if self.is_closed() {
            drop(hooks);
            hook(&self.inner.id);
        } else {
            hooks.push(Box::new(hook));
        }
    }

    /// Close the channel. Idempotent.
    ///
    /// Ends the SSE response, ends the engine's inbound queue, then runs the
    /// closure hooks.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        lock(&self.inner.outbound).take();
        lock(&self.inner.inbound_tx).take();
        let hooks = std::mem::take(&mut *lock(&self.inner.hooks));

        debug!(session_id = %self.inner.id, hooks = hooks.len(), "channel closed");
        for hook in hooks {
            hook(&self.inner.id);
        }
    }
}

impl fmt::Debug for SseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseChannel")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct CloseOnDrop(SseChannel);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Outbound event stream backing one SSE response.
///
/// Ends when the channel closes; closes the channel when dropped.
pub struct EventStream {
    events: UnboundedReceiverStream<Event>,
    _guard: CloseOnDrop,
}

impl Stream for EventStream {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events)
            .poll_next(cx)
            .map(|event| event.map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, response::sse::Sse};
    use futures_util::StreamExt;
    use std::sync::atomic::AtomicUsize;

    /// Read SSE text until a full event (blank-line terminated) is buffered.
    async fn next_event(body: &mut axum::body::BodyDataStream) -> Option<String> {
        let mut buf = String::new();
        while !buf.contains("\n\n") {
            let chunk = body.next().await?.ok()?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
        }
        Some(buf)
    }

    fn sse_body(stream: EventStream) -> axum::body::BodyDataStream {
        Sse::new(stream).into_response().into_body().into_data_stream()
    }

    fn post(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp/message");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    #[test]
    fn test_endpoint_carries_session_id() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        assert_eq!(
            channel.endpoint(),
            format!("/mcp/message?sessionId={}", channel.session_id())
        );
        assert!(!channel.is_closed());
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("Application/JSON; charset=utf-8"));
        assert!(!is_json("text/plain"));
        assert!(!is_json(""));
    }

    #[tokio::test]
    async fn test_start_emits_endpoint_event() {
        let (channel, stream) = SseChannel::open("/mcp/message");
        let mut body = sse_body(stream);

        channel.start().unwrap();

        let event = next_event(&mut body).await.unwrap();
        assert!(event.contains("event: endpoint"));
        assert!(event.contains(&format!("data: {}", channel.endpoint())));
    }

    #[test]
    fn test_start_twice_fails() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        channel.start().unwrap();
        assert!(matches!(channel.start(), Err(BridgeError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_send_emits_message_event() {
        let (channel, stream) = SseChannel::open("/mcp/message");
        let mut body = sse_body(stream);

        channel
            .send(&serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
            .unwrap();

        let event = next_event(&mut body).await.unwrap();
        assert!(event.contains("event: message"));
        assert!(event.contains(r#"data: {"id":1,"jsonrpc":"2.0","result":{}}"#));
    }

    #[test]
    fn test_send_after_close_fails() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        channel.close();
        let result = channel.send(&serde_json::json!({}));
        assert!(matches!(result, Err(BridgeError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let (channel, mut stream) = SseChannel::open("/mcp/message");
        channel.close();
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_dropping_stream_closes_channel() {
        let (channel, stream) = SseChannel::open("/mcp/message");
        drop(stream);
        assert!(channel.is_closed());
    }

    #[test]
    fn test_hooks_run_once_in_order() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["registry", "engine"] {
            let order = Arc::clone(&order);
            channel.on_close(move |_| order.lock().unwrap().push(tag));
        }

        channel.close();
        channel.close();

        assert_eq!(*order.lock().unwrap(), vec!["registry", "engine"]);
    }

    #[test]
    fn test_hook_receives_session_id() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        channel.on_close(move |id| *slot.lock().unwrap() = Some(id.clone()));

        channel.close();

        assert_eq!(seen.lock().unwrap().as_ref(), Some(channel.session_id()));
    }

    #[test]
    fn test_late_hook_runs_immediately() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        channel.close();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        channel.on_close(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_post_queues_message() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let mut incoming = channel.take_incoming().unwrap();

        let response = channel
            .handle_post(
                post(Some("application/json"), r#"{"jsonrpc":"2.0","method":"ping","id":7}"#),
                1024,
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let message = incoming.recv().await.unwrap();
        assert_eq!(message["method"], "ping");
        assert_eq!(message["id"], 7);
    }

    #[test]
    fn test_take_incoming_once() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        assert!(channel.take_incoming().is_some());
        assert!(channel.take_incoming().is_none());
    }

    #[tokio::test]
    async fn test_handle_post_rejects_wrong_content_type() {
        let (channel, _stream) = SseChannel::open("/mcp/message");

        let result = channel.handle_post(post(Some("text/plain"), "{}"), 1024).await;
        assert!(matches!(result, Err(BridgeError::UnsupportedContentType(_))));

        let result = channel.handle_post(post(None, "{}"), 1024).await;
        assert!(matches!(result, Err(BridgeError::UnsupportedContentType(_))));
    }

    #[tokio::test]
    async fn test_handle_post_rejects_invalid_json() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let result = channel
            .handle_post(post(Some("application/json"), "{ nope"), 1024)
            .await;
        assert!(matches!(result, Err(BridgeError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn test_handle_post_enforces_size_limit() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let big = format!(r#"{{"pad":"{}"}}"#, "x".repeat(64));
        let result = channel
            .handle_post(post(Some("application/json"), &big), 16)
            .await;
        assert!(matches!(result, Err(BridgeError::BodyRead(_))));
    }

    #[tokio::test]
    async fn test_handle_post_after_close() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        channel.close();
        let result = channel
            .handle_post(post(Some("application/json"), "{}"), 1024)
            .await;
        assert!(matches!(result, Err(BridgeError::ChannelClosed)));
    }
}
