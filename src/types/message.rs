//! Chat message format shared by templates, requests and the chat upstream.

use serde::{Deserialize, Serialize};

/// A single conversation turn.
///
/// `user` is the optional end-user identifier OpenAI accepts per message; it is
/// copied verbatim from the request and never interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            user: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_field_is_omitted_when_absent() {
        let value = serde_json::to_value(Message::system("hi")).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "hi"}));
    }

    #[test]
    fn deserializes_request_message() {
        let msg: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "ok", "user": "u1"}))
                .unwrap();
        assert_eq!(msg, Message::assistant("ok").with_user("u1"));
    }
}
