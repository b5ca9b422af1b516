//! Registry of open sessions.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::SessionId;
use crate::transport::SseChannel;

/// Thread-safe map from session ID to the channel serving it.
///
/// A key is present exactly while its channel is open: the stream-open path
/// inserts, the channel's closure hook removes. Every operation is a short
/// non-suspending critical section, so a lookup from a message-post never
/// observes a half-applied insert or removal.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SseChannel>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register `channel` under `id`, replacing any previous entry.
    pub fn register(&self, id: SessionId, channel: SseChannel) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, channel);
    }

    /// Look up the channel serving `id`.
    pub fn lookup(&self, id: &str) -> Option<SseChannel> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Check if a session is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Remove a session. Removing an unknown ID is a no-op.
    ///
    /// Returns the removed channel, or None if it wasn't registered.
    pub fn remove(&self, id: &str) -> Option<SseChannel> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Get the number of registered sessions.
    pub fn count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// List all registered session IDs.
    pub fn list_ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Close every registered channel.
    ///
    /// Used on server shutdown. Closure hooks call back into [`remove`], so
    /// the channels are collected first and closed outside the lock.
    ///
    /// Returns the number of channels closed.
    ///
    /// [`remove`]: SessionRegistry::remove
    pub fn close_all(&self) -> usize {
        let channels: Vec<SseChannel> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for channel in &channels {
            channel.close();
        }

        // Entries whose channel had no removal hook installed
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, channel| !channel.is_closed());

        channels.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
