//! Embedding client for generating embeddings.

use super::types::{EmbeddingRequest, EmbeddingResponse};
use crate::transport::{Transport, UpstreamRequest};
use crate::types::EmbedRequest;
use crate::{Error, ErrorContext, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Model used for every embedding request, whatever the caller asks for.
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

pub struct EmbeddingClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: SecretString,
}

impl EmbeddingClient {
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
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }

    pub async fn embed(&self, request: EmbedRequest) -> Result<EmbeddingResponse> {
        let input = request.input.ok_or_else(|| {
            Error::validation_with_context(
                "Missing input",
                ErrorContext::new()
                    .with_field_path("input")
                    .with_source("embeddings"),
            )
        })?;
        if let Some(requested) = request.model.as_deref() {
            if requested != EMBEDDING_MODEL {
                tracing::debug!(requested, "ignoring requested embedding model");
            }
        }

        let body = EmbeddingRequest {
            input,
            model: EMBEDDING_MODEL.to_string(),
            user: request.user,
        };
        let upstream = UpstreamRequest::post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(serde_json::to_value(&body)?);

        let response = self.transport.send(upstream).await?.error_for_status().await?;
        let text = response.text().await?;
        let parsed: EmbeddingResponse = serde_json::from_str(&text)?;
        tracing::debug!(count = parsed.len(), "received embeddings");
        Ok(parsed)
    }
}
