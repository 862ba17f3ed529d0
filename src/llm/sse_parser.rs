// ABOUTME: SSE (Server-Sent Events) line-buffering parser for provider streaming responses
// ABOUTME: Handles partial lines across TCP boundaries, multiple events per chunk, and [DONE]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # SSE Stream Parser
//!
//! Upstream providers answer with a newline-delimited event stream where each
//! `data:` line carries one JSON object and `data: [DONE]` ends the stream.
//! TCP chunks do not line up with those lines, so [`SseLineBuffer`] keeps the
//! trailing partial line between reads.
//!
//! [`create_sse_stream`] turns a raw byte stream into a [`ChatStream`]:
//!
//! - each JSON object maps to zero or one [`StreamDelta`] via the `parse_data` closure
//! - transport errors (already mapped by the caller) and decode errors end the
//!   stream after yielding one `Err`
//! - `[DONE]` ends the stream without reading further bytes

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};

use super::{ChatStream, StreamDelta};
use crate::errors::AppResult;

/// Sentinel payload that terminates an OpenAI-style stream
const DONE_SENTINEL: &str = "[DONE]";

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Line-buffering SSE parser that handles partial lines across TCP chunk boundaries
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated text not yet terminated by a newline
    buffer: String,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from a TCP chunk, returning every complete SSE event
    ///
    /// A trailing partial line stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the byte stream has ended
    pub fn flush(&mut self) -> Option<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        parse_line(&remaining)
    }
}

/// Parse one SSE line; blank lines and non-data fields yield nothing
fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() {
        None
    } else if data == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_owned()))
    }
}

/// Internal state for the SSE stream unfold
struct SseStreamState<F> {
    byte_stream: Pin<Box<dyn Stream<Item = AppResult<Bytes>> + Send>>,
    parser: SseLineBuffer,
    parse_data: F,
    pending: VecDeque<AppResult<StreamDelta>>,
    finished: bool,
}

impl<F> SseStreamState<F>
where
    F: Fn(&str) -> AppResult<Option<StreamDelta>>,
{
    /// Queue the deltas produced by parsed events; stop at `[DONE]` or the first error
    fn absorb(&mut self, events: impl IntoIterator<Item = SseEvent>) {
        for event in events {
            if self.finished {
                return;
            }
            match event {
                SseEvent::Done => self.finished = true,
                SseEvent::Data(json_str) => match (self.parse_data)(&json_str) {
                    Ok(Some(delta)) => self.pending.push_back(Ok(delta)),
                    Ok(None) => {}
                    Err(e) => {
                        self.pending.push_back(Err(e));
                        self.finished = true;
                    }
                },
            }
        }
    }
}

/// Create a line-buffered delta stream from a raw provider byte stream
///
/// `parse_data` converts one JSON payload into an optional delta; returning
/// `Ok(None)` skips payloads that carry neither text nor usage.
pub fn create_sse_stream<S, F>(byte_stream: S, parse_data: F) -> ChatStream
where
    S: Stream<Item = AppResult<Bytes>> + Send + 'static,
    F: Fn(&str) -> AppResult<Option<StreamDelta>> + Send + 'static,
{
    let state = SseStreamState {
        byte_stream: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        parse_data,
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.byte_stream.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.feed(&bytes);
                    state.absorb(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    let tail = state.parser.flush();
                    state.absorb(tail);
                    state.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}
