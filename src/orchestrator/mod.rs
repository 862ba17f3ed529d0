// ABOUTME: Streaming orchestrator driving one chat message from admission to terminal event
// ABOUTME: Composes rate limiting, persistence, prompt assembly, provider streaming, and usage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Streaming Orchestrator
//!
//! A run moves through
//! `Admitting -> Persisting(UserMsg) -> Assembling -> Streaming -> Finalizing -> Closed`,
//! with `Rejected`, `Failed` and `Cancelled` as alternate ends.
//!
//! - Validation and admission run synchronously in [`ChatOrchestrator::send_message`];
//!   a rejection yields a stream holding one error event and touches nothing else.
//! - The rest runs on a [`RunExecutor`] worker. The worker and a timeout
//!   watcher share the run's [`EventSink`]; the first to claim the terminal
//!   slot decides between `done` and `error`.
//! - Client disconnect (dropping the [`EventStream`]), the timeout, and the
//!   run's own completion all fire one [`CancellationToken`]. The worker
//!   selects on it from admission through the assistant message write, so
//!   the upstream stream or a pending write is dropped at the next
//!   suspension point.
//! - The worker claims the terminal slot only once the reply is committed.
//!   Usage is recorded after the claim and never for a cancelled run.

mod events;
mod pool;
mod run;
mod sink;
mod stream;

pub use events::StreamEvent;
pub use pool::RunExecutor;
pub use run::{DeltaOutcome, OrchestrationRun};
pub use sink::EventSink;
pub use stream::EventStream;

use std::sync::Arc;
use std::time::Duration;

use chatline_core::constants::{limits, llm};
use chatline_core::models::{ChatId, ConversationTurn, MessageId, NewMessage, UserId};
use futures_util::StreamExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info_span, Instrument};

use crate::config::{OrchestrationConfig, RateLimitConfig, ServerConfig};
use crate::database::{ChatStore, UsageStore};
use crate::errors::{AppError, AppResult};
use crate::llm::{ChatRequest, LlmProvider, PromptAssembler};
use crate::logging::{CompletedRun, RunLogger};
use crate::rate_limiting::ChatRateLimiter;
use crate::usage::UsageLedger;

/// Inbound chat message with optional per-request overrides
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    /// Sender
    pub user_id: UserId,
    /// Target chat
    pub chat_id: ChatId,
    /// Message text
    pub content: String,
    /// Model override
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Max tokens override
    pub max_tokens: Option<u32>,
    /// Correlation id of the HTTP request that started the run
    pub trace_id: Option<String>,
}

impl SendMessageRequest {
    /// Request with no overrides
    #[must_use]
    pub fn new(user_id: UserId, chat_id: ChatId, content: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            content: content.into(),
            model: None,
            temperature: None,
            max_tokens: None,
            trace_id: None,
        }
    }

    /// Attach a correlation id
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Check content and overrides
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` describing the first invalid field
    pub fn validate(&self) -> AppResult<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::invalid_input("Message content must not be blank"));
        }
        let chars = self.content.chars().count();
        if chars > limits::MAX_MESSAGE_CHARS {
            return Err(AppError::invalid_input(format!(
                "Message content is {chars} characters; the limit is {}",
                limits::MAX_MESSAGE_CHARS
            )));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=llm::MAX_TEMPERATURE).contains(&temperature) {
                return Err(AppError::invalid_input(format!(
                    "temperature must be between 0 and {}",
                    llm::MAX_TEMPERATURE
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(AppError::invalid_input("maxTokens must be at least 1"));
        }
        Ok(())
    }
}

/// Tunables the orchestrator reads once at construction
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Temperature when the request has none
    pub default_temperature: f32,
    /// Max tokens when the request has none
    pub default_max_tokens: u32,
    /// Admission control
    pub rate_limit: RateLimitConfig,
    /// Pool sizing and run timeout
    pub orchestration: OrchestrationConfig,
    /// System instructions for every prompt
    pub assembler: PromptAssembler,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_temperature: llm::DEFAULT_TEMPERATURE,
            default_max_tokens: llm::DEFAULT_MAX_TOKENS,
            rate_limit: RateLimitConfig::default(),
            orchestration: OrchestrationConfig::default(),
            assembler: PromptAssembler::default(),
        }
    }
}

impl OrchestratorSettings {
    /// Settings from server configuration
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            default_temperature: config.llm.temperature,
            default_max_tokens: config.llm.max_tokens,
            rate_limit: config.rate_limit,
            orchestration: config.orchestration,
            assembler: PromptAssembler::default(),
        }
    }
}

/// How the run ended without an error
enum StreamEnd {
    Persisted(MessageId),
    ClientGone,
}

struct Inner {
    provider: Arc<dyn LlmProvider>,
    chats: Arc<dyn ChatStore>,
    ledger: UsageLedger,
    limiter: ChatRateLimiter,
    assembler: PromptAssembler,
    executor: RunExecutor,
    default_temperature: f32,
    default_max_tokens: u32,
    run_timeout: Duration,
}

/// Entry point for streaming chat replies
#[derive(Clone)]
pub struct ChatOrchestrator {
    inner: Arc<Inner>,
}

impl ChatOrchestrator {
    /// Assemble an orchestrator from its collaborators
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        chats: Arc<dyn ChatStore>,
        usage: Arc<dyn UsageStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        let executor = RunExecutor::new(
            settings.orchestration.worker_pool_size,
            settings.orchestration.queue_depth,
        );
        Self {
            inner: Arc::new(Inner {
                provider,
                chats,
                ledger: UsageLedger::new(usage),
                limiter: ChatRateLimiter::new(settings.rate_limit),
                assembler: settings.assembler,
                executor,
                default_temperature: settings.default_temperature,
                default_max_tokens: settings.default_max_tokens,
                run_timeout: settings.orchestration.run_timeout(),
            }),
        }
    }

    /// Provider serving every run
    #[must_use]
    pub fn provider(&self) -> &dyn LlmProvider {
        self.inner.provider.as_ref()
    }

    /// Worker pool, exposed for health reporting
    #[must_use]
    pub fn executor(&self) -> &RunExecutor {
        &self.inner.executor
    }

    /// Start a run and return its event stream
    ///
    /// Never fails directly: every failure, including rejection before the
    /// run starts, arrives as the stream's single error event. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn send_message(&self, request: SendMessageRequest) -> EventStream {
        let (user_id, chat_id) = (request.user_id, request.chat_id);

        if let Err(error) = request
            .validate()
            .and_then(|()| self.inner.limiter.check(user_id))
        {
            RunLogger::log_failed(user_id, chat_id, error.code, &error.message);
            return EventStream::rejected(&error);
        }

        let cancel = CancellationToken::new();
        let (sink, receiver) = EventSink::channel();
        let events = EventStream::new(receiver, cancel.clone());

        let span = info_span!(
            "chat_run",
            user.id = %user_id,
            chat.id = %chat_id,
            trace.id = field::Empty,
        );
        if let Some(trace_id) = request.trace_id.as_deref() {
            span.record("trace.id", trace_id);
        }
        let worker = Arc::clone(&self.inner)
            .execute(request, Arc::clone(&sink), cancel.clone())
            .instrument(span.clone());

        if let Err(error) = self.inner.executor.submit(&cancel, worker) {
            RunLogger::log_failed(user_id, chat_id, error.code, &error.message);
            return EventStream::rejected(&error);
        }

        tokio::spawn(
            watch_timeout(self.inner.run_timeout, user_id, chat_id, sink, cancel)
                .instrument(span),
        );
        events
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("provider", &self.inner.provider.name())
            .field("run_timeout", &self.inner.run_timeout)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Worker body: stream and persist under cancellation, then finish or fail
    async fn execute(
        self: Arc<Self>,
        request: SendMessageRequest,
        sink: Arc<EventSink>,
        cancel: CancellationToken,
    ) {
        let mut run = OrchestrationRun::new(request.user_id, request.chat_id);

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.stream_reply(&request, &sink, &mut run) => Some(result),
        };

        match outcome {
            Some(Ok(StreamEnd::Persisted(message_id))) => {
                self.complete(&request, &sink, &cancel, &run, message_id).await;
            }
            Some(Ok(StreamEnd::ClientGone)) | None => {
                // a finished sink here means the watcher already reported a timeout
                if !sink.is_finished() {
                    RunLogger::log_cancelled(
                        run.user_id(),
                        run.chat_id(),
                        run.text().chars().count(),
                    );
                }
                sink.close();
            }
            Some(Err(error)) => {
                if sink.fail(&error) {
                    RunLogger::log_failed(
                        run.user_id(),
                        run.chat_id(),
                        error.code,
                        &error.message,
                    );
                }
            }
        }

        cancel.cancel();
    }

    /// `Persisting(UserMsg) -> Assembling -> Streaming -> Finalizing(AssistantMsg)`
    async fn stream_reply(
        &self,
        request: &SendMessageRequest,
        sink: &EventSink,
        run: &mut OrchestrationRun,
    ) -> AppResult<StreamEnd> {
        self.chats
            .find_chat_owned_by(request.user_id, request.chat_id)
            .await?;
        self.chats
            .append_message(request.chat_id, NewMessage::user(request.content.clone()))
            .await?;

        let history = self.chats.list_turns(request.chat_id).await?;
        let provider_request = self.provider_request(request, &history);
        debug!(
            turns = history.len(),
            model = provider_request.model.as_deref().unwrap_or_default(),
            "Prompt assembled"
        );

        let mut upstream = self.provider.stream_chat(&provider_request).await?;
        while let Some(item) = upstream.next().await {
            let delta = item?;
            if run.apply_delta(&delta, sink) == DeltaOutcome::ChannelClosed {
                return Ok(StreamEnd::ClientGone);
            }
        }
        drop(upstream);

        let message = NewMessage::assistant(
            run.text(),
            self.provider.name(),
            self.resolve_model(request),
            run.usage(),
        );
        let message_id = self.chats.append_message(run.chat_id(), message).await?;
        Ok(StreamEnd::Persisted(message_id))
    }

    fn provider_request(
        &self,
        request: &SendMessageRequest,
        history: &[ConversationTurn],
    ) -> ChatRequest {
        ChatRequest::new(self.assembler.build(history, None))
            .with_model(self.resolve_model(request))
            .with_temperature(request.temperature.unwrap_or(self.default_temperature))
            .with_max_tokens(request.max_tokens.unwrap_or(self.default_max_tokens))
    }

    /// Requested model, or the provider default when absent or blank
    fn resolve_model(&self, request: &SendMessageRequest) -> String {
        request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
            .to_owned()
    }

    /// Claim the terminal slot for a committed reply, record usage, emit `done`
    async fn complete(
        &self,
        request: &SendMessageRequest,
        sink: &EventSink,
        cancel: &CancellationToken,
        run: &OrchestrationRun,
        message_id: MessageId,
    ) {
        // lost to the timeout watcher, which already reported the run
        if !sink.claim_terminal() {
            return;
        }
        if cancel.is_cancelled() {
            RunLogger::log_cancelled(run.user_id(), run.chat_id(), run.text().chars().count());
            sink.close();
            return;
        }

        let provider = self.provider.name();
        let model = self.resolve_model(request);
        let usage = run.usage();
        let usage_recorded = self
            .ledger
            .record(
                run.user_id(),
                run.chat_id(),
                message_id,
                provider,
                &model,
                usage,
            )
            .await;

        let usage = usage.unwrap_or_default();
        sink.send_terminal(StreamEvent::done(usage));
        RunLogger::log_completed(
            run.user_id(),
            run.chat_id(),
            CompletedRun {
                provider,
                model: &model,
                usage,
                chars: run.text().chars().count(),
                usage_recorded,
            },
        );
    }
}

/// Emit `LLM_TIMEOUT` and cancel the run once `timeout` elapses
async fn watch_timeout(
    timeout: Duration,
    user_id: UserId,
    chat_id: ChatId,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
) {
    tokio::select! {
        () = cancel.cancelled() => {}
        () = sleep(timeout) => {
            let error = AppError::timeout(timeout.as_secs());
            if sink.fail(&error) {
                RunLogger::log_failed(user_id, chat_id, error.code, &error.message);
                cancel.cancel();
            }
        }
    }
}
