use serde::{Deserialize, Serialize};

use crate::types::{ChatRole, ChatTurn, SessionId};

/// Name given to every session until its first user turn renames it.
pub const DEFAULT_SESSION_NAME: &str = "New Chat";

/// Number of characters of the first user turn used for the session name.
const AUTO_NAME_CHARS: usize = 25;

/// A named conversation.
///
/// Sessions are owned by a [`SessionList`](crate::SessionList); every change goes
/// through one of its operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique identifier, assigned at creation.
    pub id: SessionId,

    /// Display name.
    pub name: String,

    /// Model selected for this session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ordered turns of the conversation.
    #[serde(rename = "messages", default)]
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    /// Create an empty session with the default name.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            name: DEFAULT_SESSION_NAME.to_string(),
            model: None,
            turns: Vec::new(),
        }
    }

    /// True while the session still carries the synthetic default name.
    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_SESSION_NAME
    }

    /// The last turn, if any.
    pub fn last_turn(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Number of turns in the session.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when the session has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push_turn(&mut self, turn: ChatTurn) {
        if turn.role == ChatRole::User && self.has_default_name() {
            self.name = auto_name(&turn.content);
        }
        self.turns.push(turn);
    }

    pub(crate) fn replace_trailing_assistant(&mut self, content: String) {
        match self.turns.last_mut() {
            Some(last) if last.is_assistant() => last.content = content,
            _ => self.turns.push(ChatTurn::assistant(content)),
        }
    }
}

/// Derive a session name from the text of its first user turn.
pub fn auto_name(content: &str) -> String {
    let mut chars = content.chars();
    let name: String = chars.by_ref().take(AUTO_NAME_CHARS).collect();
    if chars.next().is_some() {
        format!("{name}…")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_layout_uses_messages() {
        let mut session = ChatSession::new(SessionId::from("1"));
        session.turns.push(ChatTurn::user("hi"));
        assert_eq!(
            serde_json::to_value(&session).unwrap(),
            json!({
                "id": "1",
                "name": "New Chat",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn deserializes_without_model_or_messages() {
        let session: ChatSession =
            serde_json::from_value(json!({"id": "7", "name": "Old"})).unwrap();
        assert_eq!(session.name, "Old");
        assert!(session.model.is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn auto_name_truncates_by_characters() {
        assert_eq!(auto_name("short question"), "short question");
        assert_eq!(
            auto_name("explain how lifetimes interact with async blocks"),
            "explain how lifetimes int…"
        );
        let exact = "a".repeat(25);
        assert_eq!(auto_name(&exact), exact);
        assert_eq!(auto_name(&"é".repeat(30)), format!("{}…", "é".repeat(25)));
    }

    #[test]
    fn first_user_turn_renames_default_session() {
        let mut session = ChatSession::new(SessionId::from("1"));
        session.push_turn(ChatTurn::system("be brief"));
        assert!(session.has_default_name());
        session.push_turn(ChatTurn::user("What is Rust?"));
        assert_eq!(session.name, "What is Rust?");
        session.push_turn(ChatTurn::user("And Cargo?"));
        assert_eq!(session.name, "What is Rust?");
    }

    #[test]
    fn replace_trailing_assistant_creates_then_replaces() {
        let mut session = ChatSession::new(SessionId::from("1"));
        session.push_turn(ChatTurn::user("hi"));
        session.replace_trailing_assistant("he".to_string());
        session.replace_trailing_assistant("hello".to_string());
        assert_eq!(session.len(), 2);
        assert_eq!(session.last_turn(), Some(&ChatTurn::assistant("hello")));
    }
}
