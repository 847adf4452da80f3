use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a chat session.
///
/// Identifiers are derived from the creation time in milliseconds and are never
/// reused within a session list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an identifier from a millisecond timestamp.
    pub fn from_millis(millis: i128) -> Self {
        Self(millis.to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value of the identifier, when it was created from a timestamp.
    pub fn millis(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_string() {
        let id = SessionId::from_millis(1_700_000_000_000);
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            serde_json::json!("1700000000000")
        );
        assert_eq!(id.millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn opaque_ids_have_no_millis() {
        let id = SessionId::from("chat-a");
        assert_eq!(id.as_str(), "chat-a");
        assert_eq!(id.millis(), None);
    }
}
