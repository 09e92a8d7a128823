//! # ai-relay
//!
//! A thin relay that lets a web front end reach OpenAI (chat completions,
//! embeddings, transcription) and ElevenLabs (text-to-speech) through one
//! endpoint.
//!
//! ## Overview
//!
//! Every inbound body is JSON tagged with an `$action`. The [`Dispatcher`]
//! authorizes it, checks the tag against the configured allow-list, validates
//! the payload, merges chat requests with a named prompt [`Template`], and
//! forwards the result to exactly one upstream adapter. Credentials live only
//! on the server side.
//!
//! ```text
//! JSON body ─→ Authorizer ─→ $action ─→ allow-list ─→ credential ─→ payload
//!                                                                     │
//!             ┌──────────────┬──────────────┬─────────────────────────┤
//!             ▼              ▼              ▼                         ▼
//!           chat          embed        transcribe                   speak
//!     (template merge,  (fixed model)  (data URL → multipart)  (audio → data URL)
//!      optional SSE)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_relay::{DispatchOutput, Dispatcher, RelayConfig, RequestMeta, Template};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> ai_relay::Result<()> {
//!     let dispatcher = Dispatcher::builder()
//!         .config(RelayConfig::from_env()?)
//!         .template(Template::new("tutor").with_system_prompt("You teach {{subject}}."))
//!         .build()?;
//!
//!     let body = json!({
//!         "$action": "chat",
//!         "template": "tutor",
//!         "inputs": {"subject": "chemistry"},
//!         "messages": [{"role": "user", "content": "What is a mole?"}]
//!     });
//!     if let DispatchOutput::Text(text) = dispatcher.dispatch(body, &RequestMeta::new()).await? {
//!         println!("{}", text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`dispatch`] | Request dispatcher, authorizer hook, request metadata |
//! | [`template`] | Prompt templates, registry, interpolation and merge |
//! | [`chat`] | Chat-completions adapter |
//! | [`embeddings`] | Embeddings adapter |
//! | [`stt`] | Transcription adapter |
//! | [`tts`] | ElevenLabs speech adapter |
//! | [`pipeline`] | SSE decoding and partial-message accumulation |
//! | [`transport`] | Outbound call seam and the reqwest implementation |
//! | [`config`] | Relay configuration (YAML and environment) |
//! | [`types`] | Request envelope, messages, stream events |
//! | `server` | axum route serving the dispatcher (feature `server`) |

pub mod chat;
pub mod config;
pub mod dispatch;
pub mod embeddings;
pub mod pipeline;
pub mod stt;
pub mod template;
pub mod transport;
pub mod tts;
pub mod types;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

// Re-export main types for convenience
pub use config::{RelayConfig, ServerConfig};
pub use dispatch::{AllowAll, Authorizer, DispatchOutput, Dispatcher, DispatcherBuilder, RequestMeta};
pub use pipeline::{ChatEventStream, FramePolicy};
pub use template::{ChatDefaults, Template, TemplateParams, TemplateRegistry};
pub use types::{
    events::ChatEvent,
    message::{Message, MessageRole},
    request::{Action, ActionRequest},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
