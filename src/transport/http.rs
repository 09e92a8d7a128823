use super::{Method, RequestBody, Transport, TransportError, UpstreamRequest, UpstreamResponse};
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpTransportConfig {
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }
}

impl HttpTransportConfig {
    /// Defaults, overridable through the environment:
    /// - `AI_HTTP_TIMEOUT_SECS`
    /// - `AI_HTTP_POOL_MAX_IDLE_PER_HOST`
    /// - `AI_HTTP_POOL_IDLE_TIMEOUT_SECS`
    /// - `AI_PROXY_URL`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env::var("AI_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            pool_max_idle_per_host: env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: env::var("AI_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
            proxy_url: env::var("AI_PROXY_URL").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// reqwest-backed transport used in production.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout));

        if let Some(proxy_url) = &config.proxy_url {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!("ignoring invalid AI_PROXY_URL: {}", e),
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&HttpTransportConfig::from_env())
    }

    fn build_form(form: super::MultipartForm) -> Result<reqwest::multipart::Form> {
        let mut out = reqwest::multipart::Form::new();
        for (name, value) in form.fields {
            out = out.text(name, value);
        }
        for file in form.files {
            let part = reqwest::multipart::Part::bytes(file.data.to_vec())
                .file_name(file.file_name)
                .mime_str(&file.mime_type)
                .map_err(TransportError::Http)?;
            out = out.part(file.name, part);
        }
        Ok(out)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        tracing::debug!(url = %request.url, method = ?request.method, "sending upstream request");

        let mut req = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Get => self.client.get(&request.url),
        };
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req = match request.body {
            RequestBody::Empty => req,
            RequestBody::Json(body) => req.json(&body),
            RequestBody::Multipart(form) => req.multipart(Self::build_form(form)?),
        };

        let resp = req.send().await.map_err(TransportError::Http)?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = resp
            .bytes_stream()
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)));

        Ok(UpstreamResponse::new(status, content_type, Box::pin(body)))
    }
}
