//! Streaming transport.
//!
//! Provides the per-session SSE channel that carries server-to-client
//! events and accepts client-to-server posts.

mod sse;

pub use sse::{EventStream, SseChannel};
