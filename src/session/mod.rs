//! Session management module.
//!
//! This module provides session identification, extraction of session IDs
//! from message-post URLs, and the registry that routes them to channels.

mod extract;
mod id;
mod registry;

pub use extract::{extract_session_id, SessionIdExtractor, DEFAULT_MESSAGE_PATH};
pub use id::SessionId;
pub use registry::SessionRegistry;
