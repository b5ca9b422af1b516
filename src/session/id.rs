//! Session identifier type.

use std::borrow::Borrow;
use std::fmt;

use uuid::Uuid;

/// Opaque identifier for one open streaming session.
///
/// IDs are minted by the channel when it is opened (a random UUID v4) and are
/// unique among concurrently open sessions. IDs coming back from clients are
/// wrapped verbatim via `From<&str>`; no validation happens beyond what the
/// URL extractor already enforces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new random session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
