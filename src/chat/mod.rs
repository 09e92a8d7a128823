//! Chat-completions adapter.
//!
//! Sends a prepared [`ChatCompletionBody`](crate::template::ChatCompletionBody)
//! and relays the answer either as raw text or as a stream of
//! [`ChatEvent`](crate::types::ChatEvent)s.

mod client;

pub use client::{ChatClient, ChatReply};
