//! # Request dispatcher
//!
//! Single entry point for inbound action requests. Each call runs, in order:
//!
//! 1. the application's [`Authorizer`] (rejection ⇒ [`Error::Unauthorized`]),
//! 2. `$action` presence and resolution,
//! 3. the configured allow-list,
//! 4. the credential the action needs,
//! 5. payload validation,
//!
//! and then routes to exactly one upstream adapter.
//!
//! Credentials are configured per upstream, so the credential check needs the
//! resolved action and runs after steps 2 and 3. A request with neither a
//! credential nor an `$action` therefore fails as a missing action. Every
//! check before routing fails with 400 and makes no upstream call.
//!
//! ```rust
//! use ai_relay::dispatch::{DispatchOutput, Dispatcher, RequestMeta};
//! use ai_relay::transport::{UpstreamRequest, UpstreamResponse};
//! use ai_relay::RelayConfig;
//! use serde_json::json;
//!
//! # async fn demo() -> ai_relay::Result<()> {
//! let upstream = |_req: UpstreamRequest| async move {
//!     Ok::<_, ai_relay::Error>(UpstreamResponse::from_bytes(
//!         200,
//!         "application/json",
//!         r#"{"choices":[]}"#,
//!     ))
//! };
//! let dispatcher = Dispatcher::builder()
//!     .config(RelayConfig::new().with_openai_api_key("sk-test"))
//!     .transport(upstream)
//!     .build()?;
//!
//! let body = json!({"$action": "chat", "messages": [{"role": "user", "content": "Hi"}]});
//! match dispatcher.dispatch(body, &RequestMeta::new()).await? {
//!     DispatchOutput::Text(text) => assert_eq!(text, r#"{"choices":[]}"#),
//!     other => panic!("unexpected output: {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod builder;

pub use auth::{AllowAll, Authorizer, RequestMeta};
pub use builder::DispatcherBuilder;

use crate::chat::{ChatClient, ChatReply};
use crate::config::RelayConfig;
use crate::embeddings::EmbeddingClient;
use crate::pipeline::ChatEventStream;
use crate::stt::SttClient;
use crate::template::{prepare_chat_body, ChatCompletionBody, Template, TemplateRegistry};
use crate::transport::Transport;
use crate::tts::TtsClient;
use crate::types::{
    Action, ActionRequest, ChatRequest, EmbedRequest, SpeakRequest, TranscribeRequest,
};
use crate::{Error, ErrorContext, Result};
use secrecy::SecretString;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Result of a dispatched action.
pub enum DispatchOutput {
    /// Raw upstream text (non-streaming chat, transcribe).
    Text(String),
    /// Reshaped JSON (embed, speak).
    Json(Value),
    /// Partial-message events (streaming chat).
    Stream(ChatEventStream),
}

impl fmt::Debug for DispatchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DispatchOutput::Json(value) => f.debug_tuple("Json").field(value).finish(),
            DispatchOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Validates, merges and forwards action requests. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) config: Arc<RelayConfig>,
    pub(crate) templates: Arc<TemplateRegistry>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Add or replace a template. Visible to every later request.
    pub fn register_template(&self, template: Template) {
        self.templates.register(template);
    }

    /// Run one inbound request through the full pipeline.
    pub async fn dispatch(&self, body: Value, meta: &RequestMeta) -> Result<DispatchOutput> {
        if !self.authorizer.authorize(&body, meta).await {
            tracing::warn!(request_id = %meta.request_id, "request rejected by authorizer");
            return Err(Error::Unauthorized);
        }

        let action = self.resolve_action(&body, meta)?;
        let api_key = self.credential(action)?;
        let request = ActionRequest::from_body(action, body)?;

        tracing::info!(request_id = %meta.request_id, action = %action, "dispatching request");
        match request {
            ActionRequest::Chat(req) => self.chat(&req, api_key).await,
            ActionRequest::Transcribe(req) => self.transcribe(&req, api_key).await,
            ActionRequest::Embed(req) => self.embed(req, api_key).await,
            ActionRequest::Speak(req) => self.speak(&req, api_key).await,
        }
    }

    /// Merge defaults, the named template and the request without sending anything.
    pub fn prepare_chat(&self, request: &ChatRequest) -> Result<ChatCompletionBody> {
        let template = request.template.as_deref().and_then(|id| {
            let found = self.templates.get(id);
            if found.is_none() {
                tracing::debug!(template = id, "template not registered, using defaults");
            }
            found
        });
        prepare_chat_body(&self.config.chat_defaults, template.as_deref(), request)
    }

    fn resolve_action(&self, body: &Value, meta: &RequestMeta) -> Result<Action> {
        let tag = Action::tag_of(body).map_err(|e| {
            tracing::warn!(request_id = %meta.request_id, "request without action tag");
            e
        })?;
        let action: Action = tag.parse().map_err(|e| {
            tracing::warn!(request_id = %meta.request_id, action = tag, "unknown action");
            e
        })?;
        if !self.config.is_allowed(action) {
            tracing::warn!(request_id = %meta.request_id, action = %action, "action not allowed");
            return Err(Error::unsupported_action(action.as_str()));
        }
        Ok(action)
    }

    fn credential(&self, action: Action) -> Result<SecretString> {
        self.config.credential_for(action).cloned().ok_or_else(|| {
            let var = match action {
                Action::Speak => "ELEVENLABS_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            Error::configuration_with_context(
                format!("Missing {}", var),
                ErrorContext::new()
                    .with_field_path(var)
                    .with_source(action.as_str()),
            )
        })
    }

    async fn chat(&self, request: &ChatRequest, api_key: SecretString) -> Result<DispatchOutput> {
        let body = self.prepare_chat(request)?;
        let client = ChatClient::new(
            self.transport.clone(),
            self.config.openai_base_url.as_str(),
            api_key,
        )
        .with_frame_policy(self.config.malformed_frames);

        Ok(match client.complete(&body).await? {
            ChatReply::Text(text) => DispatchOutput::Text(text),
            ChatReply::Stream(events) => DispatchOutput::Stream(events),
        })
    }

    async fn transcribe(
        &self,
        request: &TranscribeRequest,
        api_key: SecretString,
    ) -> Result<DispatchOutput> {
        let client = SttClient::new(
            self.transport.clone(),
            self.config.openai_base_url.as_str(),
            api_key,
        );
        Ok(DispatchOutput::Text(client.transcribe(request).await?))
    }

    async fn embed(&self, request: EmbedRequest, api_key: SecretString) -> Result<DispatchOutput> {
        let client = EmbeddingClient::new(
            self.transport.clone(),
            self.config.openai_base_url.as_str(),
            api_key,
        );
        Ok(DispatchOutput::Json(client.embed(request).await?.into_envelope()))
    }

    async fn speak(&self, request: &SpeakRequest, api_key: SecretString) -> Result<DispatchOutput> {
        let client = TtsClient::new(
            self.transport.clone(),
            self.config.elevenlabs_base_url.as_str(),
            api_key,
        );
        Ok(DispatchOutput::Json(client.speak(request).await?))
    }
}
