use serde::{Deserialize, Serialize};

use crate::types::ChatRole;

/// One role-tagged message within a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The role that produced the content.
    pub role: ChatRole,

    /// The text of the turn.
    pub content: String,
}

impl ChatTurn {
    /// Create a new `ChatTurn`.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Create a developer turn.
    pub fn developer(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Developer, content)
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// True if the turn was produced by the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role == ChatRole::Assistant
    }
}
