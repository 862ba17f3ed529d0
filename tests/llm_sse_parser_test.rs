// ABOUTME: Integration tests for turning provider byte streams into delta streams
// ABOUTME: Covers split chunks, the [DONE] sentinel, and error termination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use bytes::Bytes;
use chatline_core::errors::ErrorCode;
use chatline_server::errors::{AppError, AppResult};
use chatline_server::llm::sse_parser::create_sse_stream;
use chatline_server::llm::StreamDelta;
use futures_util::{stream, StreamExt};

/// Treat each payload as the literal text of a delta; `skip` yields nothing
fn text_payload(data: &str) -> AppResult<Option<StreamDelta>> {
    match data {
        "skip" => Ok(None),
        "bad" => Err(AppError::stream_error("bad payload")),
        text => Ok(Some(StreamDelta::text(text))),
    }
}

fn chunks(parts: &[&'static str]) -> Vec<AppResult<Bytes>> {
    parts
        .iter()
        .map(|part| Ok(Bytes::from_static(part.as_bytes())))
        .collect()
}

#[tokio::test]
async fn test_events_split_across_chunks() {
    let bytes = stream::iter(chunks(&["data: he", "llo\n\ndata: sk", "ip\ndata: world\n"]));
    let items: Vec<_> = create_sse_stream(bytes, text_payload).collect().await;

    let deltas: Vec<StreamDelta> = items.into_iter().map(Result::unwrap).collect();
    assert_eq!(
        deltas,
        vec![StreamDelta::text("hello"), StreamDelta::text("world")]
    );
}

#[tokio::test]
async fn test_done_stops_reading() {
    let mut parts = chunks(&["data: a\n\ndata: [DONE]\n\n"]);
    parts.push(Err(AppError::internal("must not be read")));
    let items: Vec<_> = create_sse_stream(stream::iter(parts), text_payload)
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), &StreamDelta::text("a"));
}

#[tokio::test]
async fn test_decode_error_ends_stream() {
    let bytes = stream::iter(chunks(&["data: a\ndata: bad\ndata: c\n"]));
    let items: Vec<_> = create_sse_stream(bytes, text_payload).collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(
        items[1].as_ref().unwrap_err().code,
        ErrorCode::LlmStreamError
    );
}

#[tokio::test]
async fn test_transport_error_ends_stream() {
    let mut parts = chunks(&["data: a\n"]);
    parts.push(Err(AppError::upstream("openai", "connection reset")));
    parts.extend(chunks(&["data: b\n"]));
    let items: Vec<_> = create_sse_stream(stream::iter(parts), text_payload)
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(
        items[1].as_ref().unwrap_err().code,
        ErrorCode::LlmProviderError
    );
}

#[tokio::test]
async fn test_unterminated_final_line_is_flushed() {
    let bytes = stream::iter(chunks(&["data: tail"]));
    let items: Vec<_> = create_sse_stream(bytes, text_payload).collect().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), &StreamDelta::text("tail"));
}
