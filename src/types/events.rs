//! Streaming chat events.

use serde::{Deserialize, Serialize};

use super::MessageRole;

/// One step of a streamed chat completion.
///
/// `content` is everything received so far; `delta` is only the text this event
/// added. Exactly one event in a stream has `is_first` set, and exactly one has
/// `is_last` set (the same event when the stream carries a single chunk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub role: MessageRole,
    pub content: String,
    pub delta: String,
    pub is_first: bool,
    pub is_last: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChatEvent {
    /// The accumulated message as a plain assistant turn.
    pub fn to_message(&self) -> super::Message {
        super::Message::new(self.role, self.content.clone())
    }
}
