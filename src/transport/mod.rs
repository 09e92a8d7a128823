//! # Transport
//!
//! Every upstream call goes through a [`Transport`]. The production
//! implementation is [`HttpTransport`] (reqwest); tests substitute a closure or
//! a recording mock.
//!
//! ```rust
//! use ai_relay::transport::{Transport, UpstreamRequest, UpstreamResponse};
//!
//! # async fn demo() -> ai_relay::Result<()> {
//! let canned = |_req: UpstreamRequest| async move {
//!     Ok::<_, ai_relay::Error>(UpstreamResponse::from_bytes(
//!         200,
//!         "application/json",
//!         r#"{"ok":true}"#,
//!     ))
//! };
//! let resp = canned.send(UpstreamRequest::post("http://upstream.test/v1")).await?;
//! assert_eq!(resp.text().await?, r#"{"ok":true}"#);
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::{HttpTransport, HttpTransportConfig};

use crate::{BoxStream, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, TryStreamExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Headers whose values never appear in `Debug` output or logs.
const REDACTED_HEADERS: &[&str] = &["authorization", "xi-api-key"];

/// Outbound call seam.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

#[async_trait]
impl<F, Fut> Transport for F
where
    F: Fn(UpstreamRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<UpstreamResponse>> + Send,
{
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        (self)(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// Multipart form, kept inspectable so tests can assert on what was sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, PartialEq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A fully described outbound request.
#[derive(Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl UpstreamRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {}", token))
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if REDACTED_HEADERS.iter().any(|h| k.eq_ignore_ascii_case(h)) {
                    (k.as_str(), "[redacted]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("UpstreamRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Response from an upstream call. The body is consumed lazily.
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    body: BoxStream<'static, Bytes>,
}

impl UpstreamResponse {
    pub fn new(status: u16, content_type: Option<String>, body: BoxStream<'static, Bytes>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Response whose whole body is already in memory.
    pub fn from_bytes(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        let bytes: Bytes = body.into();
        Self::new(
            status,
            Some(content_type.to_string()),
            Box::pin(stream::once(async move { Ok(bytes) })),
        )
    }

    /// Response delivered in the given chunks, in order.
    pub fn from_chunks<I, B>(status: u16, content_type: &str, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(
            status,
            Some(content_type.to_string()),
            Box::pin(stream::iter(chunks)),
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub async fn bytes(self) -> Result<Bytes> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        if chunks.len() == 1 {
            return Ok(chunks.into_iter().next().unwrap_or_default());
        }
        let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn into_stream(self) -> BoxStream<'static, Bytes> {
        self.body
    }

    /// Turn a non-success response into [`crate::Error::Upstream`] carrying the body text.
    pub async fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status;
        let text = self.text().await?;
        tracing::debug!(status, "upstream returned an error status");
        Err(crate::Error::upstream(status, text))
    }
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
