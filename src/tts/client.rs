//! TTS (Text-to-Speech) client.

use crate::transport::{Transport, UpstreamRequest};
use crate::types::{SpeakRequest, VoiceSettings};
use crate::utils::to_data_url;
use crate::{Error, ErrorContext, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Client for ElevenLabs text-to-speech synthesis.
pub struct TtsClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: SecretString,
}

impl TtsClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            voice_id
        )
    }

    /// Build the synthesis request, applying model, voice and settings defaults.
    pub fn build_request(&self, request: &SpeakRequest) -> Result<UpstreamRequest> {
        let text = request
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::validation_with_context(
                    "Missing text",
                    ErrorContext::new().with_field_path("text").with_source("tts"),
                )
            })?;
        let model_id = request.model_id.as_deref().unwrap_or(DEFAULT_TTS_MODEL);
        let voice_id = request.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
        let voice_settings = request.voice_settings.unwrap_or_default();

        Ok(UpstreamRequest::post(self.endpoint(voice_id))
            .header("xi-api-key", self.api_key.expose_secret())
            .header("accept", DEFAULT_AUDIO_MIME)
            .header("content-type", "application/json")
            .json(json!({
                "text": text,
                "model_id": model_id,
                "voice_settings": voice_settings_json(&voice_settings),
            })))
    }

    /// Synthesize speech and return `{"audioUrl": "data:audio/mpeg;base64,..."}`.
    pub async fn speak(&self, request: &SpeakRequest) -> Result<serde_json::Value> {
        let upstream = self.build_request(request)?;
        let response = self.transport.send(upstream).await?.error_for_status().await?;

        let mime = response
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| ct.starts_with("audio/"))
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), %mime, "received synthesized audio");

        Ok(json!({ "audioUrl": to_data_url(&mime, &audio) }))
    }
}

fn voice_settings_json(settings: &VoiceSettings) -> serde_json::Value {
    json!({
        "stability": settings.stability,
        "similarity_boost": settings.similarity_boost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::UpstreamResponse;

    fn client() -> TtsClient {
        let transport = |_req: UpstreamRequest| async move {
            Ok::<_, Error>(UpstreamResponse::from_bytes(200, "audio/mpeg", vec![1u8, 2, 3]))
        };
        TtsClient::new(
            Arc::new(transport),
            "https://api.elevenlabs.io/",
            SecretString::from("el-key"),
        )
    }

    #[test]
    fn defaults_apply_when_ids_are_absent() {
        let req = client()
            .build_request(&SpeakRequest {
                text: Some("hello".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            req.url,
            format!("https://api.elevenlabs.io/v1/text-to-speech/{}", DEFAULT_VOICE_ID)
        );
        let body = req.json_body().unwrap();
        assert_eq!(body["model_id"], DEFAULT_TTS_MODEL);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["voice_settings"]["stability"], 0.5);
        assert_eq!(req.header_value("xi-api-key"), Some("el-key"));
        assert!(req.header_value("authorization").is_none());
    }

    #[test]
    fn explicit_ids_win() {
        let req = client()
            .build_request(&SpeakRequest {
                text: Some("hello".into()),
                model_id: Some("eleven_multilingual_v2".into()),
                voice_id: Some("voice-7".into()),
                voice_settings: Some(VoiceSettings {
                    stability: 0.25,
                    similarity_boost: 1.0,
                }),
            })
            .unwrap();
        assert!(req.url.ends_with("/v1/text-to-speech/voice-7"));
        let body = req.json_body().unwrap();
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["similarity_boost"], 1.0);
    }

    #[test]
    fn missing_text_is_validation_error() {
        let err = client().build_request(&SpeakRequest::default()).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn audio_becomes_data_url() {
        let out = client()
            .speak(&SpeakRequest {
                text: Some("hi".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out["audioUrl"], "data:audio/mpeg;base64,AQID");
    }
}
