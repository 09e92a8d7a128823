use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;

/// What the relay knows about the inbound call besides its body.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Correlation id for logs.
    pub request_id: String,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub remote_addr: Option<SocketAddr>,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMeta {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            headers: HashMap::new(),
            remote_addr: None,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Application-supplied gate run before anything else looks at a request.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, body: &Value, meta: &RequestMeta) -> bool;
}

#[async_trait]
impl<F> Authorizer for F
where
    F: Fn(&Value, &RequestMeta) -> bool + Send + Sync,
{
    async fn authorize(&self, body: &Value, meta: &RequestMeta) -> bool {
        (self)(body, meta)
    }
}

/// Accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _body: &Value, _meta: &RequestMeta) -> bool {
        true
    }
}
