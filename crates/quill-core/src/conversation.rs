//! Conversation log for the chat view
//!
//! Messages are appended in turn order and never edited or removed. The
//! request coordinator is the only writer; the UI reads snapshots.

use serde::{Deserialize, Serialize};

/// Prefix placed on assistant messages that stand in for a failed request.
pub const ERROR_MARKER: &str = "⚠ Error: ";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Assistant placeholder for a request that did not produce a reply.
    pub fn error(detail: impl std::fmt::Display) -> Self {
        Self::assistant(format!("{ERROR_MARKER}{detail}"))
    }

    pub fn is_error(&self) -> bool {
        self.role == Role::Assistant && self.content.starts_with(ERROR_MARKER)
    }
}

/// Append-only, ordered message log
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Copy of the log in display order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("first"));
        conversation.append(Message::assistant("second"));
        conversation.append(Message::user("third"));

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(conversation.last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("hello"));
        assert_eq!(conversation.snapshot(), conversation.snapshot());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("hello"));
        let before = conversation.snapshot();
        conversation.append(Message::assistant("hi"));

        assert_eq!(before.len(), 1);
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_error_message_is_marked() {
        let message = Message::error("connection refused");
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.starts_with(ERROR_MARKER));
        assert!(message.is_error());
        assert!(!Message::assistant("all good").is_error());
        assert!(!Message::user(format!("{ERROR_MARKER}typed by user")).is_error());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
