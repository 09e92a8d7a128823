//! # HTTP route
//!
//! Mounts a [`Dispatcher`] on a single `POST` route.
//!
//! | Output | Response |
//! |--------|----------|
//! | `Text` | 200, body as-is (`application/json` when it parses as JSON, else `text/plain`) |
//! | `Json` | 200, JSON |
//! | `Stream` | SSE: `message` events, then `error` if the stream fails |
//! | error | status from [`crate::Error::status_code`], `{"error": {"message", "status"}}` |

mod error;
mod sse;

pub use error::ApiError;
pub use sse::to_sse_response;

use crate::dispatch::{DispatchOutput, Dispatcher, RequestMeta};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body. Transcription requests carry audio inline.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Router with the relay mounted at `path`.
pub fn router(dispatcher: Dispatcher, path: &str) -> Router {
    Router::new()
        .route(path, post(handle))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(dispatcher)
}

async fn handle(State(dispatcher): State<Dispatcher>, request: Request) -> Response {
    match relay(&dispatcher, request).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn relay(dispatcher: &Dispatcher, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let mut meta = RequestMeta::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(v) = value.to_str() {
            meta = meta.with_header(name.as_str(), v);
        }
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        meta = meta.with_remote_addr(*addr);
    }

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::bad_request(format!("Unreadable request body: {}", e)))?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;

    let output = dispatcher.dispatch(body, &meta).await.map_err(|e| {
        tracing::debug!(request_id = %meta.request_id, status = e.status_code(), "request failed");
        ApiError::from(e)
    })?;

    Ok(match output {
        DispatchOutput::Text(text) => {
            let content_type = if serde_json::from_str::<serde_json::Value>(&text).is_ok() {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            ([(header::CONTENT_TYPE, content_type)], text).into_response()
        }
        DispatchOutput::Json(value) => Json(value).into_response(),
        DispatchOutput::Stream(events) => to_sse_response(events).into_response(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::transport::{UpstreamRequest, UpstreamResponse};
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app(allow: bool) -> Router {
        let upstream = |_req: UpstreamRequest| async move {
            Ok::<_, crate::Error>(UpstreamResponse::from_bytes(
                200,
                "application/json",
                r#"{"id":"cmpl-1"}"#,
            ))
        };
        let dispatcher = Dispatcher::builder()
            .config(RelayConfig::new().with_openai_api_key("sk-test"))
            .authorizer(move |_: &serde_json::Value, _: &RequestMeta| allow)
            .transport(upstream)
            .build()
            .unwrap();
        router(dispatcher, "/api/ai")
    }

    fn post_json(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/ai")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn chat_text_is_relayed_as_json() {
        let resp = app(true)
            .oneshot(post_json(
                r#"{"$action":"chat","messages":[{"role":"user","content":"hi"}]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(resp).await["id"], "cmpl-1");
    }

    #[tokio::test]
    async fn rejected_request_is_405() {
        let resp = app(false)
            .oneshot(post_json(r#"{"$action":"chat"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["status"], 405);
        assert_eq!(body["error"]["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn bad_json_is_400() {
        let resp = app(true).oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
