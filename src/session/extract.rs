//! Session ID extraction from message-post URLs.
//!
//! Clients address a session in one of two ways:
//!
//! - path-embedded: `/mcp/message/{sessionId}`
//! - query-embedded: `/mcp/message?sessionId={sessionId}`
//!
//! The path form wins when both are present.

use std::sync::LazyLock;

use regex::Regex;

/// Default message-post base path.
pub const DEFAULT_MESSAGE_PATH: &str = "/mcp/message";

static DEFAULT_EXTRACTOR: LazyLock<SessionIdExtractor> =
    LazyLock::new(SessionIdExtractor::default);

static QUERY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]sessionId=([^&]+)").expect("static session query pattern is valid")
});

/// Pulls a session ID out of a request URL.
#[derive(Debug, Clone)]
pub struct SessionIdExtractor {
    path_pattern: Regex,
}

impl SessionIdExtractor {
    /// Build an extractor for messages posted under `base_path`.
    ///
    /// The base path is matched literally.
    pub fn new(base_path: &str) -> Self {
        let base = regex::escape(base_path.trim_end_matches('/'));
        let path_pattern = Regex::new(&format!("{base}/([^/?]+)"))
            .expect("escaped literal always forms a valid pattern");
        Self { path_pattern }
    }

    /// Extract the session ID from `url` (path plus optional query).
    ///
    /// Returns the raw substring, undecoded, or `None` when neither form
    /// matches.
    pub fn extract<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.path_pattern
            .captures(url)
            .or_else(|| QUERY_PATTERN.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for SessionIdExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_PATH)
    }
}

/// Extract a session ID using the default `/mcp/message` base path.
pub fn extract_session_id(url: &str) -> Option<&str> {
    DEFAULT_EXTRACTOR.extract(url)
}
