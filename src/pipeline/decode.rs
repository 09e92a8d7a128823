//! Streaming decoder (Bytes -> JSON Value) for the chat-completions SSE body.

use crate::pipeline::{FramePolicy, PipelineError};
use crate::BoxStream;
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;

/// Line-oriented SSE decoder:
/// - splits on `\n` (a trailing `\r` is dropped)
/// - strips `prefix` (default "data: ")
/// - stops on `done_signal` (default "[DONE]")
/// - ignores blank lines, `:` comments and other SSE fields (`event:`, `id:`, `retry:`)
pub struct SseDecoder {
    prefix: String,
    done_signal: String,
    policy: FramePolicy,
}

enum Line {
    Skip,
    Done,
    Payload(Value),
    Malformed { frame: String, reason: String },
}

struct DecodeState {
    input: BoxStream<'static, Bytes>,
    buf: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new(policy: FramePolicy) -> Self {
        Self::with_markers("data: ", "[DONE]", policy)
    }

    pub fn with_markers(
        prefix: impl Into<String>,
        done_signal: impl Into<String>,
        policy: FramePolicy,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            done_signal: done_signal.into(),
            policy,
        }
    }

    fn classify(line: &str, prefix: &str, done_signal: &str) -> Line {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(':') {
            return Line::Skip;
        }

        let payload = if let Some(rest) = trimmed.strip_prefix(prefix.trim_end()) {
            rest.trim_start()
        } else if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if ["event:", "id:", "retry:"]
            .iter()
            .any(|field| trimmed.starts_with(field))
        {
            return Line::Skip;
        } else {
            trimmed
        };

        if payload == done_signal {
            return Line::Done;
        }
        if payload.is_empty() {
            return Line::Skip;
        }

        match serde_json::from_str(payload) {
            Ok(v) => Line::Payload(v),
            Err(e) => Line::Malformed {
                frame: payload.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Decode `input` into JSON frames. Ends at the terminator or at end of input.
    pub fn frames(&self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, Value> {
        let prefix = self.prefix.clone();
        let done_signal = self.done_signal.clone();
        let policy = self.policy;

        let state = DecodeState {
            input,
            buf: Vec::new(),
            finished: false,
        };

        let stream = stream::unfold(state, move |mut state| {
            let prefix = prefix.clone();
            let done_signal = done_signal.clone();
            async move {
                if state.finished {
                    return None;
                }
                loop {
                    // Emit complete lines from the buffer first.
                    let line = match state.buf.iter().position(|b| *b == b'\n') {
                        Some(idx) => {
                            let raw: Vec<u8> = state.buf.drain(..=idx).collect();
                            Some(String::from_utf8_lossy(&raw).into_owned())
                        }
                        None => None,
                    };

                    let line = match line {
                        Some(line) => line,
                        None => match state.input.next().await {
                            Some(Ok(bytes)) => {
                                state.buf.extend_from_slice(&bytes);
                                continue;
                            }
                            Some(Err(e)) => {
                                state.finished = true;
                                return Some((Err(e), state));
                            }
                            None => {
                                // EOF: whatever is left is the final line.
                                state.finished = true;
                                if state.buf.is_empty() {
                                    return None;
                                }
                                let raw = std::mem::take(&mut state.buf);
                                String::from_utf8_lossy(&raw).into_owned()
                            }
                        },
                    };

                    match Self::classify(&line, &prefix, &done_signal) {
                        Line::Skip => {
                            if state.finished {
                                return None;
                            }
                        }
                        Line::Done => return None,
                        Line::Payload(v) => return Some((Ok(v), state)),
                        Line::Malformed { frame, reason } => match policy {
                            FramePolicy::Abort => {
                                state.finished = true;
                                let err = PipelineError::MalformedFrame { frame, reason };
                                return Some((Err(err.into()), state));
                            }
                            FramePolicy::Skip => {
                                tracing::warn!(%reason, "skipping malformed stream frame");
                                if state.finished {
                                    return None;
                                }
                            }
                        },
                    }
                }
            }
        });

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes_stream(chunks: Vec<&'static str>) -> BoxStream<'static, Bytes> {
        Box::pin(stream::iter(chunks).map(|s| Ok(Bytes::from(s))))
    }

    async fn collect(decoder: &SseDecoder, chunks: Vec<&'static str>) -> Vec<crate::Result<Value>> {
        decoder.frames(bytes_stream(chunks)).collect().await
    }

    #[tokio::test]
    async fn stops_at_terminator() {
        let out = collect(
            &SseDecoder::new(FramePolicy::Abort),
            vec!["data: {\"a\":1}\n\ndata: [DONE]\n\ndata: {\"a\":2}\n\n"],
        )
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &json!({"a": 1}));
    }

    #[tokio::test]
    async fn reassembles_split_frames() {
        let out = collect(
            &SseDecoder::new(FramePolicy::Abort),
            vec!["da", "ta: {\"te", "xt\":\"h\"}\n", "\n", "data: [DO", "NE]\n\n"],
        )
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &json!({"text": "h"}));
    }

    #[tokio::test]
    async fn keeps_multibyte_chars_split_across_chunks() {
        // "é" is 0xC3 0xA9; split it between two chunks.
        let first: &'static [u8] = b"data: {\"t\":\"\xC3";
        let second: &'static [u8] = b"\xA9\"}\n\n";
        let input: BoxStream<'static, Bytes> = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(first)),
            Ok(Bytes::from_static(second)),
        ]));
        let out: Vec<_> = SseDecoder::new(FramePolicy::Abort)
            .frames(input)
            .collect()
            .await;
        assert_eq!(out[0].as_ref().unwrap(), &json!({"t": "é"}));
    }

    #[tokio::test]
    async fn ignores_comments_and_other_fields() {
        let out = collect(
            &SseDecoder::new(FramePolicy::Abort),
            vec![": keep-alive\r\nevent: message\r\ndata: {\"x\":true}\r\n\r\n"],
        )
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &json!({"x": true}));
    }

    #[tokio::test]
    async fn malformed_frame_aborts() {
        let out = collect(
            &SseDecoder::new(FramePolicy::Abort),
            vec!["data: {\"a\":1}\n\ndata: {not json\n\ndata: {\"a\":2}\n\n"],
        )
        .await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(
            out[1],
            Err(crate::Error::Stream(PipelineError::MalformedFrame { .. }))
        ));
    }

    #[tokio::test]
    async fn malformed_frame_skipped() {
        let out = collect(
            &SseDecoder::new(FramePolicy::Skip),
            vec!["data: {\"a\":1}\n\ndata: {not json\n\ndata: {\"a\":2}\n\n"],
        )
        .await;
        let values: Vec<Value> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[tokio::test]
    async fn trailing_frame_without_newline() {
        let out = collect(&SseDecoder::new(FramePolicy::Abort), vec!["data: {\"z\":0}"]).await;
        assert_eq!(out.len(), 1);
    }
}
