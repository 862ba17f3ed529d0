// ABOUTME: Per-request accumulator holding the reply buffer and last-seen usage
// ABOUTME: Applies each upstream delta by appending first and forwarding second
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use chatline_core::models::{ChatId, TokenUsage, UserId};

use super::sink::EventSink;
use crate::llm::StreamDelta;

/// Result of applying one delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Text was appended and forwarded
    Forwarded,
    /// Only usage (or nothing) changed
    Absorbed,
    /// The output channel is closed; stop consuming upstream
    ChannelClosed,
}

/// State of one orchestration run
///
/// The buffer is written only by [`OrchestrationRun::apply_delta`], so at
/// completion it equals the concatenation of every forwarded delta.
#[derive(Debug)]
pub struct OrchestrationRun {
    user_id: UserId,
    chat_id: ChatId,
    buffer: String,
    usage: Option<TokenUsage>,
    forwarded: usize,
}

impl OrchestrationRun {
    /// Start an empty run
    #[must_use]
    pub const fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            chat_id,
            buffer: String::new(),
            usage: None,
            forwarded: 0,
        }
    }

    /// Owning user
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Target chat
    #[must_use]
    pub const fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Accumulated reply text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Last usage pair reported by the provider
    #[must_use]
    pub const fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    /// Number of deltas forwarded to the client
    #[must_use]
    pub const fn forwarded_deltas(&self) -> usize {
        self.forwarded
    }

    /// Apply one upstream delta
    ///
    /// Usage overwrites the previous pair (counts are cumulative). Text is
    /// appended to the buffer before it is forwarded; if forwarding fails the
    /// text was still appended, but the run is abandoned and nothing is
    /// persisted.
    pub fn apply_delta(&mut self, delta: &StreamDelta, sink: &EventSink) -> DeltaOutcome {
        if delta.has_usage() {
            self.usage = Some(delta.usage_or_zero());
        }

        let Some(text) = delta.text_fragment() else {
            return DeltaOutcome::Absorbed;
        };

        self.buffer.push_str(text);
        if sink.send_delta(text) {
            self.forwarded += 1;
            DeltaOutcome::Forwarded
        } else {
            DeltaOutcome::ChannelClosed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StreamEvent;

    #[test]
    fn test_usage_is_last_write_wins() {
        let (sink, _rx) = EventSink::channel();
        let mut run = OrchestrationRun::new(UserId::new(), ChatId::new());

        run.apply_delta(&StreamDelta::usage(5, 1), &sink);
        run.apply_delta(&StreamDelta::usage(10, 2), &sink);

        assert_eq!(run.usage(), Some(TokenUsage::new(10, 2)));
        assert_eq!(run.forwarded_deltas(), 0);
    }

    #[test]
    fn test_text_is_buffered_and_forwarded_in_order() {
        let (sink, mut rx) = EventSink::channel();
        let mut run = OrchestrationRun::new(UserId::new(), ChatId::new());

        assert_eq!(
            run.apply_delta(&StreamDelta::text("A"), &sink),
            DeltaOutcome::Forwarded
        );
        assert_eq!(
            run.apply_delta(&StreamDelta::text(""), &sink),
            DeltaOutcome::Absorbed
        );
        assert_eq!(
            run.apply_delta(&StreamDelta::text("B"), &sink),
            DeltaOutcome::Forwarded
        );

        assert_eq!(run.text(), "AB");
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::delta("A"));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::delta("B"));
    }

    #[test]
    fn test_closed_channel_stops_the_run() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        let mut run = OrchestrationRun::new(UserId::new(), ChatId::new());

        assert_eq!(
            run.apply_delta(&StreamDelta::text("late"), &sink),
            DeltaOutcome::ChannelClosed
        );
    }
}
