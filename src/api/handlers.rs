//! Request dispatcher.
//!
//! Every request lands in [`dispatch`], which classifies it in order:
//!
//! 1. `OPTIONS` (any path): CORS preflight, `204 No Content`.
//! 2. `GET` on the stream path: open a session and stream events.
//! 3. `POST` under the message path: route the body to its session.
//! 4. Anything else: `404 {"error":"Not found"}`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use tracing::{debug, error, info, warn};

use super::types::ErrorResponse;
use crate::engine::{PingEngine, ProtocolEngine};
use crate::error::BridgeError;
use crate::session::{SessionIdExtractor, SessionRegistry, DEFAULT_MESSAGE_PATH};
use crate::transport::SseChannel;

/// Default stream-open path.
pub const DEFAULT_STREAM_PATH: &str = "/mcp";

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Default cap on a posted message body.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Routing and transport settings for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Path a `GET` must hit exactly to open a stream.
    pub stream_path: String,
    /// Base path for message posts (`{base}/{id}` or `{base}?sessionId={id}`).
    pub message_path: String,
    /// Interval between keep-alive comments on open streams.
    pub keep_alive: Duration,
    /// Largest accepted message body, in bytes.
    pub max_message_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            message_path: DEFAULT_MESSAGE_PATH.to_string(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl DispatchConfig {
    /// Whether a request URI names the stream path exactly, with no query.
    pub fn is_stream_target(&self, uri: &Uri) -> bool {
        uri.path() == self.stream_path && uri.query().is_none()
    }

    /// Whether `path` is the message base itself or a segment below it.
    ///
    /// Sibling paths sharing the base as a string prefix (`/mcp/messages`)
    /// do not match.
    pub fn is_message_path(&self, path: &str) -> bool {
        let base = self.message_path.trim_end_matches('/');
        path.strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<dyn ProtocolEngine>,
    pub config: Arc<DispatchConfig>,
    extractor: Arc<SessionIdExtractor>,
}

impl AppState {
    /// State with default routes and the built-in [`PingEngine`].
    pub fn new() -> Self {
        Self::with_engine(Arc::new(PingEngine::new()))
    }

    pub fn with_engine(engine: Arc<dyn ProtocolEngine>) -> Self {
        Self::with_config(engine, DispatchConfig::default())
    }

    pub fn with_config(engine: Arc<dyn ProtocolEngine>, config: DispatchConfig) -> Self {
        let extractor = SessionIdExtractor::new(&config.message_path);
        Self {
            registry: Arc::new(SessionRegistry::new()),
            engine,
            config: Arc::new(config),
            extractor: Arc::new(extractor),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for every inbound request.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }

    if method == Method::GET && state.config.is_stream_target(request.uri()) {
        return open_stream(&state);
    }

    if method == Method::POST && state.config.is_message_path(&path) {
        return post_message(&state, request).await;
    }

    debug!(%method, %path, "no route");
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found())).into_response()
}

/// Open a session: register its channel, then let the engine take over.
///
/// The engine is connected on a detached task; this handler returns the SSE
/// response without waiting for it.
fn open_stream(state: &AppState) -> Response {
    let (channel, stream) = SseChannel::open(&state.config.message_path);
    let session_id = channel.session_id().clone();

    // Routable before the engine or the client can act on it
    state.registry.register(session_id.clone(), channel.clone());

    let registry = Arc::downgrade(&state.registry);
    channel.on_close(move |id| {
        if let Some(registry) = registry.upgrade() {
            registry.remove(id.as_str());
        }
        info!(session_id = %id, "session closed");
    });

    info!(session_id = %session_id, "session opened");

    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        if let Err(e) = engine.connect(channel.clone()).await {
            error!(session_id = %session_id, error = %e, "protocol engine failed to connect");
            channel.close();
        }
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive))
        .into_response()
}

/// Route a posted message to the session named in its URL.
async fn post_message(state: &AppState, request: Request) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| request.uri().path());

    let channel = state
        .extractor
        .extract(target)
        .and_then(|id| state.registry.lookup(id));

    let Some(channel) = channel else {
        debug!(uri = %request.uri(), "message for unknown session");
        return BridgeError::SessionNotFound(target.to_owned()).into_response();
    };

    match channel
        .handle_post(request, state.config.max_message_bytes)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(session_id = %channel.session_id(), error = %e, "failed to forward message");
            e.into_response()
        }
    }
}
