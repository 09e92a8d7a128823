use super::{interpolate, Template, TemplateParams};
use crate::types::{ChatRequest, Message};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters every chat request starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 800,
            temperature: 0.7,
        }
    }
}

impl ChatDefaults {
    fn as_params(&self) -> TemplateParams {
        TemplateParams {
            model: Some(self.model.clone()),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }
}

/// Fully merged body for the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionBody {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub messages: Vec<Message>,
}

/// Merge defaults, an optional template and the request into an upstream body.
///
/// Messages are ordered: interpolated template system prompt, interpolated
/// template user prompt, then the request's own messages verbatim.
pub fn prepare_chat_body(
    defaults: &ChatDefaults,
    template: Option<&Template>,
    request: &ChatRequest,
) -> Result<ChatCompletionBody> {
    let base = defaults.as_params();
    let params = match template {
        Some(t) => base.overlay(&t.params),
        None => base,
    };

    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(t) = template {
        if let Some(prompt) = &t.system_prompt {
            messages.push(Message::system(interpolate(prompt, &request.inputs)));
        }
        if let Some(prompt) = &t.user_prompt {
            messages.push(Message::user(interpolate(prompt, &request.inputs)));
        }
    }
    messages.extend(request.messages.iter().cloned());

    if messages.is_empty() {
        return Err(Error::validation_with_context(
            "Missing messages",
            ErrorContext::new()
                .with_field_path("messages")
                .with_details("provide messages or a template with a system or user prompt"),
        ));
    }

    Ok(ChatCompletionBody {
        model: params.model.unwrap_or_else(|| defaults.model.clone()),
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        top_p: params.top_p,
        n: params.n,
        presence_penalty: params.presence_penalty,
        frequency_penalty: params.frequency_penalty,
        logit_bias: params.logit_bias,
        stream: request.stream,
        user: request.user.clone(),
        messages,
    })
}
