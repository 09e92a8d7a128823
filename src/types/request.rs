//! Inbound request envelope: an `$action` tag plus an action-specific payload.

use crate::embeddings::EmbeddingInput;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Field carrying the action tag in every request body.
pub const ACTION_FIELD: &str = "$action";

/// The four operations the relay knows how to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Chat,
    Transcribe,
    Embed,
    Speak,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Chat, Action::Transcribe, Action::Embed, Action::Speak];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Chat => "chat",
            Action::Transcribe => "transcribe",
            Action::Embed => "embed",
            Action::Speak => "speak",
        }
    }

    /// Read the raw action tag from a request body.
    ///
    /// Only checks presence; use [`str::parse`] to resolve it.
    pub fn tag_of(body: &Value) -> Result<&str> {
        body.get(ACTION_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::validation_with_context(
                    "Missing action",
                    ErrorContext::new().with_field_path(ACTION_FIELD),
                )
            })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" => Ok(Action::Chat),
            "transcribe" => Ok(Action::Transcribe),
            "embed" => Ok(Action::Embed),
            "speak" => Ok(Action::Speak),
            other => Err(Error::unsupported_action(other)),
        }
    }
}

/// Typed request payloads, discriminated by `$action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "$action", rename_all = "lowercase")]
pub enum ActionRequest {
    Chat(ChatRequest),
    Transcribe(TranscribeRequest),
    Embed(EmbedRequest),
    Speak(SpeakRequest),
}

impl ActionRequest {
    /// Validate a raw body against the payload shape of an already resolved action.
    pub fn from_body(action: Action, body: Value) -> Result<Self> {
        fn payload<T: serde::de::DeserializeOwned>(action: Action, body: Value) -> Result<T> {
            serde_json::from_value(body).map_err(|e| {
                Error::validation_with_context(
                    format!("Invalid {} request", action),
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("request"),
                )
            })
        }

        Ok(match action {
            Action::Chat => ActionRequest::Chat(payload(action, body)?),
            Action::Transcribe => ActionRequest::Transcribe(payload(action, body)?),
            Action::Embed => ActionRequest::Embed(payload(action, body)?),
            Action::Speak => ActionRequest::Speak(payload(action, body)?),
        })
    }

    /// Parse a raw body, resolving the tag first.
    pub fn parse(body: Value) -> Result<Self> {
        let action: Action = Action::tag_of(&body)?.parse()?;
        Self::from_body(action, body)
    }

    pub fn action(&self) -> Action {
        match self {
            ActionRequest::Chat(_) => Action::Chat,
            ActionRequest::Transcribe(_) => Action::Transcribe,
            ActionRequest::Embed(_) => Action::Embed,
            ActionRequest::Speak(_) => Action::Speak,
        }
    }
}

/// `chat` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<crate::types::Message>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Values for `{{placeholder}}` substitution in the template prompts.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// `transcribe` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// Audio as a base64 `data:` URL.
    #[serde(rename = "audioUrl", default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// `embed` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<EmbeddingInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Accepted for compatibility and ignored: the embedding model is fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// `speak` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeakRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
}

/// ElevenLabs voice tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_tag_is_validation_error() {
        let err = ActionRequest::parse(json!({"input": "hi"})).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = ActionRequest::parse(json!({"$action": "paint"})).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAction { ref action } if action == "paint"));
    }

    #[test]
    fn parses_chat_payload() {
        let req = ActionRequest::parse(json!({
            "$action": "chat",
            "template": "t1",
            "inputs": {"name": "Bot"},
            "messages": [{"role": "user", "content": "hello"}],
            "stream": true
        }))
        .unwrap();
        match req {
            ActionRequest::Chat(chat) => {
                assert!(chat.stream);
                assert_eq!(chat.template.as_deref(), Some("t1"));
                assert_eq!(chat.messages.len(), 1);
                assert_eq!(chat.inputs["name"], json!("Bot"));
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn parses_embed_input_forms() {
        let single = ActionRequest::parse(json!({"$action": "embed", "input": "hi"})).unwrap();
        let batch =
            ActionRequest::parse(json!({"$action": "embed", "input": ["a", "b"]})).unwrap();
        assert!(matches!(
            single,
            ActionRequest::Embed(EmbedRequest { input: Some(EmbeddingInput::Single(_)), .. })
        ));
        assert!(matches!(
            batch,
            ActionRequest::Embed(EmbedRequest { input: Some(EmbeddingInput::Batch(ref v)), .. }) if v.len() == 2
        ));
    }

    #[test]
    fn malformed_payload_is_validation_error() {
        let err = ActionRequest::parse(json!({"$action": "chat", "messages": "nope"})).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn serializes_with_tag() {
        let req = ActionRequest::Speak(SpeakRequest {
            text: Some("hello".into()),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"$action": "speak", "text": "hello"})
        );
    }
}
