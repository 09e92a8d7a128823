//! # Streaming relay
//!
//! Turns the chat-completions SSE body into a stream of [`ChatEvent`]s.
//!
//! ```text
//! Raw Bytes → SseDecoder → JSON frames → DeltaAccumulator → ChatEvent
//!               │                              │
//!         "data: " prefix,               role/content so far,
//!         [DONE] terminator              first/last flags
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`decode::SseDecoder`] | Line framing, prefix stripping, terminator detection |
//! | [`accumulate::DeltaAccumulator`] | Accumulates deltas, flags first and last events |
//! | [`FramePolicy`] | What to do with a frame whose payload is not JSON |
//!
//! ## Example
//!
//! ```rust
//! use ai_relay::pipeline::{chat_event_stream, FramePolicy};
//! use futures::StreamExt;
//!
//! # async fn demo() {
//! let chunks = vec![
//!     "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"}}]}\n\n",
//!     "data: [DONE]\n\n",
//! ];
//! let bytes = futures::stream::iter(chunks)
//!     .map(|s| Ok::<bytes::Bytes, ai_relay::Error>(bytes::Bytes::from(s)));
//! let mut events = chat_event_stream(Box::pin(bytes), FramePolicy::Abort);
//! let only = events.next().await.unwrap().unwrap();
//! assert!(only.is_first && only.is_last);
//! assert_eq!(only.content, "Hi");
//! # }
//! ```

pub mod accumulate;
pub mod decode;


use crate::types::ChatEvent;
use crate::BoxStream;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stream of partial-message events produced by a streaming chat.
pub type ChatEventStream = BoxStream<'static, ChatEvent>;

/// Handling of frames whose payload does not parse as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePolicy {
    /// Yield an error and end the stream.
    #[default]
    Abort,
    /// Log the frame and keep going.
    Skip,
}

impl FromStr for FramePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FramePolicy::Abort),
            "skip" | "drop" => Ok(FramePolicy::Skip),
            other => Err(PipelineError::Configuration(format!(
                "Unsupported frame policy: {}. Supported policies: abort, skip",
                other
            ))),
        }
    }
}

/// Pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed stream frame: {reason} (frame: {frame})")]
    MalformedFrame { frame: String, reason: String },

    #[error("Upstream reported an error mid-stream: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Decode and accumulate a raw chat-completions body.
pub fn chat_event_stream(
    input: BoxStream<'static, bytes::Bytes>,
    policy: FramePolicy,
) -> ChatEventStream {
    let frames = decode::SseDecoder::new(policy).frames(input);
    accumulate::DeltaAccumulator::new().accumulate(frames)
}
