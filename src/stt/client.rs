//! STT (Speech-to-Text) client.

use crate::transport::{FilePart, MultipartForm, Transport, UpstreamRequest};
use crate::types::TranscribeRequest;
use crate::utils::DataUrl;
use crate::{Error, ErrorContext, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Client for speech-to-text transcription.
pub struct SttClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: SecretString,
}

impl SttClient {
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

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Build the multipart form for a request. Fails before any network call
    /// when the audio reference is missing or is not a valid `data:` URL.
    pub fn build_form(request: &TranscribeRequest) -> Result<MultipartForm> {
        let audio_url = request
            .audio_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                Error::validation_with_context(
                    "Missing audioUrl",
                    ErrorContext::new()
                        .with_field_path("audioUrl")
                        .with_source("stt"),
                )
            })?;
        let audio = DataUrl::parse(audio_url)?;

        let mut form = MultipartForm::new()
            .file(FilePart {
                name: "file".to_string(),
                file_name: format!("audio.{}", audio.file_extension()),
                mime_type: audio.mime_type.clone(),
                data: audio.data,
            })
            .text("model", TRANSCRIPTION_MODEL);
        if let Some(lang) = &request.language {
            form = form.text("language", lang.clone());
        }
        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }
        Ok(form)
    }

    /// Returns the upstream response text unchanged.
    pub async fn transcribe(&self, request: &TranscribeRequest) -> Result<String> {
        let form = Self::build_form(request)?;
        let upstream = UpstreamRequest::post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form);

        let response = self.transport.send(upstream).await?.error_for_status().await?;
        response.text().await
    }
}
