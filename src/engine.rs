//! Protocol engine seam.
//!
//! The bridge only routes bytes; the protocol itself lives behind
//! [`ProtocolEngine`]. [`PingEngine`] is the built-in engine used by the
//! binary: it answers JSON-RPC `ping` and rejects everything else.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::transport::SseChannel;
use crate::Result;

/// JSON-RPC "method not found" error code.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Consumes and produces protocol messages over a channel.
#[async_trait]
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Attach to `channel` and take over pushing protocol data onto it until
    /// it closes.
    ///
    /// Returns once the engine is attached; the conversation itself runs in
    /// the background.
    async fn connect(&self, channel: SseChannel) -> Result<()>;
}

/// Minimal JSON-RPC engine: replies to `ping`, rejects other requests.
#[derive(Debug, Clone, Default)]
pub struct PingEngine;

impl PingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the reply for one inbound message, if it warrants one.
    pub fn respond(message: &Value) -> Option<Value> {
        let id = message.get("id")?;
        let method = match message.get("method").and_then(Value::as_str) {
            Some(method) => method,
            // A response from the client; nothing to answer
            None => return None,
        };

        let reply = match method {
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            other => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": METHOD_NOT_FOUND,
                    "message": format!("Method not found: {}", other),
                },
            }),
        };
        Some(reply)
    }

    async fn run(channel: SseChannel, mut incoming: mpsc::UnboundedReceiver<Value>) {
        while let Some(message) = incoming.recv().await {
            let Some(reply) = Self::respond(&message) else {
                debug!(session_id = %channel.session_id(), "ignoring message without reply");
                continue;
            };
            if let Err(e) = channel.send(&reply) {
                warn!(session_id = %channel.session_id(), error = %e, "failed to send reply");
                break;
            }
        }
    }
}

#[async_trait]
impl ProtocolEngine for PingEngine {
    async fn connect(&self, channel: SseChannel) -> Result<()> {
        let incoming = channel
            .take_incoming()
            .ok_or(BridgeError::AlreadyConnected)?;
        channel.start()?;

        channel.on_close(|id| debug!(session_id = %id, "engine detached"));
        tokio::spawn(Self::run(channel, incoming));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_reply() {
        let reply = PingEngine::respond(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
        assert_eq!(reply, Some(json!({"jsonrpc": "2.0", "id": 1, "result": {}})));
    }

    #[test]
    fn test_string_id_preserved() {
        let reply =
            PingEngine::respond(&json!({"jsonrpc": "2.0", "id": "req-9", "method": "ping"}))
                .unwrap();
        assert_eq!(reply["id"], "req-9");
    }

    #[test]
    fn test_unknown_method() {
        let reply =
            PingEngine::respond(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
                .unwrap();
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .contains("tools/list"));
    }

    #[test]
    fn test_notification_has_no_reply() {
        let reply = PingEngine::respond(
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        );
        assert!(reply.is_none());
    }

    #[test]
    fn test_client_response_has_no_reply() {
        let reply = PingEngine::respond(&json!({"jsonrpc": "2.0", "id": 3, "result": {}}));
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        let engine = PingEngine::new();

        engine.connect(channel.clone()).await.unwrap();
        let second = engine.connect(channel).await;
        assert!(matches!(second, Err(BridgeError::AlreadyConnected)));
    }

    #[tokio::test]
    async fn test_connect_closed_channel_fails() {
        let (channel, _stream) = SseChannel::open("/mcp/message");
        channel.close();

        let result = PingEngine::new().connect(channel).await;
        assert!(matches!(result, Err(BridgeError::ChannelClosed)));
    }
}
