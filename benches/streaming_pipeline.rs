//! Benchmarks for streaming chat relay
//!
//! This benchmark measures:
//! - SSE frame decoding speed
//! - Full decode + accumulate throughput
//! - Effect of chunk boundaries on decoding

use ai_relay::pipeline::{chat_event_stream, decode::SseDecoder, FramePolicy};
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use futures::StreamExt;

/// Sample SSE frames (OpenAI format)
const SSE_FRAMES: &[&str] = &[
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":"!"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
    "data: [DONE]",
];

fn sse_body(repeat: usize) -> String {
    let content = &SSE_FRAMES[1..SSE_FRAMES.len() - 2];
    let mut body = format!("{}\n\n", SSE_FRAMES[0]);
    for _ in 0..repeat {
        for frame in content {
            body.push_str(frame);
            body.push_str("\n\n");
        }
    }
    body.push_str(SSE_FRAMES[SSE_FRAMES.len() - 2]);
    body.push_str("\n\n");
    body.push_str(SSE_FRAMES[SSE_FRAMES.len() - 1]);
    body.push_str("\n\n");
    body
}

fn chunked(body: &str, size: usize) -> Vec<Bytes> {
    body.as_bytes()
        .chunks(size)
        .map(Bytes::copy_from_slice)
        .collect()
}

fn byte_stream(chunks: Vec<Bytes>) -> ai_relay::BoxStream<'static, Bytes> {
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}

fn bench_decode(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("sse_decode");

    let body = sse_body(50);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for size in [16usize, 256, 4096] {
        let chunks = chunked(&body, size);
        group.bench_function(format!("frames_chunk_{}", size), |b| {
            b.to_async(&rt).iter(|| async {
                let frames = SseDecoder::new(FramePolicy::Abort)
                    .frames(byte_stream(black_box(chunks.clone())));
                frames.count().await
            })
        });
    }

    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("chat_event_stream");

    for repeat in [1usize, 100] {
        let body = sse_body(repeat);
        let chunks = chunked(&body, 512);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(format!("decode_and_accumulate_x{}", repeat), |b| {
            b.to_async(&rt).iter(|| async {
                let mut events =
                    chat_event_stream(byte_stream(black_box(chunks.clone())), FramePolicy::Abort);
                let mut last = None;
                while let Some(ev) = events.next().await {
                    last = Some(ev.unwrap());
                }
                last
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_accumulate);
criterion_main!(benches);
