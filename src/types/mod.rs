//! # Types Module
//!
//! Wire types shared by the dispatcher, the template merge and the upstream adapters.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role, text content and optional user id |
//! | [`MessageRole`] | Message role (system, user, assistant) |
//! | [`Action`] | The four supported action tags |
//! | [`ActionRequest`] | Tagged union over the action payloads |
//! | [`ChatEvent`] | Partial-message event yielded by a streaming chat |
//!
//! ## Example
//!
//! ```rust
//! use ai_relay::types::{Message, MessageRole};
//!
//! let system = Message::system("You are a helpful assistant");
//! let user = Message::user("What's the weather?").with_user("user-42");
//! assert!(matches!(system.role, MessageRole::System));
//! assert_eq!(user.user.as_deref(), Some("user-42"));
//! ```

pub mod events;
pub mod message;
pub mod request;

pub use events::ChatEvent;
pub use message::{Message, MessageRole};
pub use request::{
    Action, ActionRequest, ChatRequest, EmbedRequest, SpeakRequest, TranscribeRequest,
    VoiceSettings,
};
