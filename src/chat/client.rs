use crate::pipeline::{chat_event_stream, ChatEventStream, FramePolicy};
use crate::template::ChatCompletionBody;
use crate::transport::{Transport, UpstreamRequest};
use crate::Result;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// What a chat call produced.
pub enum ChatReply {
    /// Upstream response text, unparsed.
    Text(String),
    /// Partial-message events, consumed lazily.
    Stream(ChatEventStream),
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatReply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ChatReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub struct ChatClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: SecretString,
    frame_policy: FramePolicy,
}

impl ChatClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            frame_policy: FramePolicy::default(),
        }
    }

    pub fn with_frame_policy(mut self, policy: FramePolicy) -> Self {
        self.frame_policy = policy;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn build_request(&self, body: &ChatCompletionBody) -> Result<UpstreamRequest> {
        let mut req = UpstreamRequest::post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(serde_json::to_value(body)?);
        if body.stream {
            req = req.header("accept", "text/event-stream");
        }
        Ok(req)
    }

    /// Single attempt, no retry. A non-success status becomes
    /// [`Error::Upstream`](crate::Error::Upstream) with the upstream text.
    pub async fn complete(&self, body: &ChatCompletionBody) -> Result<ChatReply> {
        let upstream = self.build_request(body)?;
        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            stream = body.stream,
            "calling chat completions"
        );

        let response = self.transport.send(upstream).await?.error_for_status().await?;
        if body.stream {
            Ok(ChatReply::Stream(chat_event_stream(
                response.into_stream(),
                self.frame_policy,
            )))
        } else {
            Ok(ChatReply::Text(response.text().await?))
        }
    }
}
