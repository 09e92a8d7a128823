//! Shared fixtures for integration tests

#![allow(dead_code)]

use ai_relay::transport::{HttpTransport, HttpTransportConfig, Transport, UpstreamRequest, UpstreamResponse};
use ai_relay::{Dispatcher, RelayConfig};
use async_trait::async_trait;
use mockito::{Server, ServerGuard};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned response for [`MockTransport`].
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: String,
    pub chunks: Vec<Vec<u8>>,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            chunks: vec![body.as_bytes().to_vec()],
        }
    }

    pub fn bytes(status: u16, content_type: &str, body: &[u8]) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            chunks: vec![body.to_vec()],
        }
    }

    pub fn sse(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream".to_string(),
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
        }
    }
}

/// Transport that records every request and replays canned responses in order.
///
/// When the queue is empty it answers `200 {}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<UpstreamRequest>>>,
    responses: Arc<Mutex<VecDeque<Canned>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, canned: Canned) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(canned);
        self
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: UpstreamRequest) -> ai_relay::Result<UpstreamResponse> {
        self.requests.lock().expect("requests lock").push(request);
        let canned = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Canned::json(200, "{}"));
        Ok(UpstreamResponse::from_chunks(
            canned.status,
            &canned.content_type,
            canned.chunks,
        ))
    }
}

/// Configuration with both credentials set.
pub fn config() -> RelayConfig {
    RelayConfig::new()
        .with_openai_api_key("sk-test")
        .with_elevenlabs_api_key("el-test")
}

pub fn dispatcher(config: RelayConfig, transport: &MockTransport) -> Dispatcher {
    Dispatcher::builder()
        .config(config)
        .transport(transport.clone())
        .build()
        .expect("dispatcher")
}

/// Mockito server standing in for both upstream APIs.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Dispatcher that talks to this server over real HTTP.
    pub fn dispatcher(&self) -> Dispatcher {
        let transport = HttpTransport::new(&HttpTransportConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .expect("http transport");
        Dispatcher::builder()
            .config(
                config()
                    .with_openai_base_url(self.base_url.clone())
                    .with_elevenlabs_base_url(self.base_url.clone()),
            )
            .transport(transport)
            .build()
            .expect("dispatcher")
    }
}
