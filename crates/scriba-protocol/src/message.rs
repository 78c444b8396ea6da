//! Conversation messages and request types.

use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.role == Role::Ai
    }
}

/// One entry of the server's conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Body of a chat submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let human = Message::human("what is a monad?");
        assert_eq!(human.role, Role::Human);
        assert!(!human.is_ai());

        let ai = Message::ai("a monoid in the category of endofunctors");
        assert!(ai.is_ai());
    }

    #[test]
    fn parse_history_entry() {
        let json = r#"[{"role":"human","content":"hi"},{"role":"ai","content":"hello"}]"#;
        let messages: Vec<Message> = serde_json::from_str(json).unwrap();
        assert_eq!(messages, vec![Message::human("hi"), Message::ai("hello")]);
    }

    #[test]
    fn chat_request_serialization() {
        let json = serde_json::to_value(ChatRequest::new("q")).unwrap();
        assert_eq!(json, serde_json::json!({"query": "q"}));

        let json = serde_json::to_value(ChatRequest::new("q").in_conversation("c1")).unwrap();
        assert_eq!(json["conversation_id"], "c1");
    }

    #[test]
    fn summary_without_title() {
        let summary: ConversationSummary = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
        assert_eq!(summary.id, "42");
        assert_eq!(summary.title, "");
    }
}
