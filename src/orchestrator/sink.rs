// ABOUTME: Output channel shared by the run worker and the timeout watcher
// ABOUTME: Guarantees at most one terminal event and an idempotent close
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::events::StreamEvent;
use crate::errors::AppError;

#[derive(Debug)]
struct SinkState {
    sender: Option<UnboundedSender<StreamEvent>>,
    terminal_claimed: bool,
}

/// Write side of a run's output channel
///
/// Two writers share it: the worker streaming deltas and the watcher
/// enforcing the run timeout. Whoever claims the terminal slot first owns it;
/// every later send or close is a no-op. The lock is never held across an
/// `.await`.
#[derive(Debug)]
pub struct EventSink {
    state: Mutex<SinkState>,
}

impl EventSink {
    /// Create a sink and the receiver feeding the client stream
    #[must_use]
    pub fn channel() -> (Arc<Self>, UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Self {
            state: Mutex::new(SinkState {
                sender: Some(sender),
                terminal_claimed: false,
            }),
        };
        (Arc::new(sink), receiver)
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward one delta
    ///
    /// Returns `false` once the terminal slot is claimed or the client has
    /// gone away.
    pub fn send_delta(&self, text: impl Into<String>) -> bool {
        let mut state = self.lock();
        if state.terminal_claimed {
            return false;
        }
        let Some(sender) = state.sender.as_ref() else {
            return false;
        };
        if sender.send(StreamEvent::delta(text)).is_ok() {
            true
        } else {
            state.sender = None;
            false
        }
    }

    /// Reserve the terminal slot; only the first caller gets `true`
    pub fn claim_terminal(&self) -> bool {
        let mut state = self.lock();
        if state.terminal_claimed {
            return false;
        }
        state.terminal_claimed = true;
        true
    }

    /// Send the terminal event after a successful claim and close the channel
    ///
    /// Returns whether the client received it.
    pub fn send_terminal(&self, event: StreamEvent) -> bool {
        self.lock()
            .sender
            .take()
            .is_some_and(|sender| sender.send(event).is_ok())
    }

    /// Claim the terminal slot and send `event`
    ///
    /// Returns `false` without sending if another writer already claimed it.
    pub fn finish(&self, event: StreamEvent) -> bool {
        if !self.claim_terminal() {
            return false;
        }
        self.send_terminal(event);
        true
    }

    /// Claim the terminal slot with an error event
    pub fn fail(&self, error: &AppError) -> bool {
        self.finish(StreamEvent::error(error))
    }

    /// Close without a terminal event; safe to call any number of times
    pub fn close(&self) {
        let mut state = self.lock();
        state.terminal_claimed = true;
        state.sender = None;
    }

    /// Whether a terminal event has been claimed or the sink closed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.lock().terminal_claimed
    }
}
