use crate::pipeline::ChatEventStream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{stream, Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;

/// Relay a chat event stream as SSE.
///
/// Each [`ChatEvent`](crate::ChatEvent) becomes a `message` event with JSON data.
/// A failure becomes a single `error` event and ends the response.
pub fn to_sse_response(
    events: ChatEventStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let out = stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        let event = match events.next().await? {
            Ok(ev) => {
                let data = serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string());
                return Some((Ok(Event::default().event("message").data(data)), Some(events)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat stream aborted");
                let data = json!({ "error": { "message": e.to_string() } }).to_string();
                Event::default().event("error").data(data)
            }
        };
        Some((Ok(event), None))
    });

    Sse::new(out).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{chat_event_stream, FramePolicy};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn stream_is_served_as_event_stream() {
        let chunks = vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"}}]}\n\n",
            "data: not json\n\n",
        ];
        let bytes = stream::iter(chunks)
            .map(|s| Ok::<bytes::Bytes, crate::Error>(bytes::Bytes::from(s)));
        let events = chat_event_stream(Box::pin(bytes), FramePolicy::Abort);

        let resp = to_sse_response(events).into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("event: message"));
        assert!(text.contains("\"content\":\"Hi\""));
        assert!(text.contains("event: error"));
    }
}
