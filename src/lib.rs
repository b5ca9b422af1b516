//! # mcp-sse-bridge
//!
//! Session-routing bridge that runs a bidirectional JSON-RPC protocol (MCP)
//! over plain HTTP.
//!
//! A client opens a long-lived server-sent-event stream with `GET /mcp`.
//! The bridge mints a session ID, registers the stream's channel under it,
//! and hands the channel to a [`ProtocolEngine`]. The first event on the
//! stream tells the client where to post: `/mcp/message?sessionId=<id>`.
//! Each subsequent `POST` is routed by that ID to the matching channel.
//! When the stream closes the session is unregistered.
//!
//! ## Features
//!
//! - **Session routing**: path- or query-keyed session IDs
//! - **Pluggable engine**: implement [`ProtocolEngine`] to speak your protocol
//! - **Isolated state**: registries are owned by [`api::AppState`], not global
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_sse_bridge::api::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> mcp_sse_bridge::Result<()> {
//!     mcp_sse_bridge::logging::try_init().ok();
//!     serve(ServerConfig::new("127.0.0.1", 3000)).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use engine::{PingEngine, ProtocolEngine};
pub use error::{BridgeError, Result};
pub use session::{extract_session_id, SessionId, SessionIdExtractor, SessionRegistry};
pub use transport::{EventStream, SseChannel};
