//! HTTP layer for mcp-sse-bridge.
//!
//! ## Endpoints
//!
//! - `OPTIONS *` - CORS preflight (`204 No Content`)
//! - `GET /mcp` - Open a session; the response is the session's SSE stream.
//!   The first event (`endpoint`) tells the client where to post messages.
//! - `POST /mcp/message/{sessionId}` - Deliver a message to a session
//! - `POST /mcp/message?sessionId={id}` - Same, query-keyed
//!
//! Anything else is `404 {"error":"Not found"}`. Every response carries
//! permissive CORS headers.
//!
//! ## Example
//!
//! ```no_run
//! use mcp_sse_bridge::api::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> mcp_sse_bridge::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::{dispatch, AppState, DispatchConfig};
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::ErrorResponse;
