// ABOUTME: Client-side event stream returned for each chat message
// ABOUTME: Dropping the stream cancels the run it belongs to
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::events::StreamEvent;
use crate::errors::AppError;

/// Ordered events of one run
///
/// Ends after the terminal event. Dropping it early is the client
/// disconnect signal: the run's cancellation token fires and the upstream
/// request is released.
#[derive(Debug)]
pub struct EventStream {
    events: UnboundedReceiverStream<StreamEvent>,
    _cancel_on_drop: Option<DropGuard>,
}

impl EventStream {
    pub(crate) fn new(receiver: UnboundedReceiver<StreamEvent>, cancel: CancellationToken) -> Self {
        Self {
            events: UnboundedReceiverStream::new(receiver),
            _cancel_on_drop: Some(cancel.drop_guard()),
        }
    }

    /// Stream holding a single error event, for runs rejected before start
    #[must_use]
    pub fn rejected(error: &AppError) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(StreamEvent::error(error));
        Self {
            events: UnboundedReceiverStream::new(receiver),
            _cancel_on_drop: None,
        }
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}
