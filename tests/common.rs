// ABOUTME: Shared test utilities for orchestrator, route, and provider integration tests
// ABOUTME: Provides a scripted provider, an in-memory store with fault injection, and helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `chatline_server`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use chatline_core::errors::ErrorCode;
use chatline_core::models::{
    ChatId, ChatRecord, ConversationTurn, MessageId, MessageRole, NewMessage, UsageRecord, UserId,
};
use chatline_server::database::{ChatStore, UsageStore};
use chatline_server::errors::{AppError, AppResult};
use chatline_server::llm::{ChatRequest, ChatStream, LlmProvider, StreamDelta};
use chatline_server::orchestrator::{
    ChatOrchestrator, EventStream, OrchestratorSettings, StreamEvent,
};
use chrono::Utc;
use futures_util::StreamExt;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Scripted Provider
// ============================================================================

/// One step of a scripted upstream stream
#[derive(Debug, Clone)]
pub enum Step {
    /// Yield a delta
    Delta(StreamDelta),
    /// Yield an error and stop
    Fail(ErrorCode, &'static str),
    /// Wait before the next step
    Sleep(Duration),
    /// Never yield again
    Hang,
}

/// Counts upstream stream drops
struct DropFlag(Arc<AtomicUsize>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provider replaying a fixed script and recording every request
pub struct ScriptedProvider {
    steps: Vec<Step>,
    open_error: Option<(ErrorCode, &'static str)>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    stream_drops: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            open_error: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            stream_drops: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Provider whose `stream_chat` call itself fails
    pub fn failing_open(code: ErrorCode, message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            steps: Vec::new(),
            open_error: Some((code, message)),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            stream_drops: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Text deltas followed by a usage delta
    pub fn replying(parts: &[&str], input_tokens: u32, output_tokens: u32) -> Arc<Self> {
        let mut steps: Vec<Step> = parts
            .iter()
            .map(|part| Step::Delta(StreamDelta::text(*part)))
            .collect();
        steps.push(Step::Delta(StreamDelta::usage(input_tokens, output_tokens)));
        Self::new(steps)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_drops() > 0
    }

    /// Times an upstream stream has been dropped
    pub fn stream_drops(&self) -> usize {
        self.stream_drops.load(Ordering::SeqCst)
    }

    /// Wait until the upstream stream has been dropped
    pub async fn wait_for_drop(&self) -> bool {
        for _ in 0..100 {
            if self.stream_dropped() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.stream_dropped()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn display_name(&self) -> &'static str {
        "Scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some((code, message)) = self.open_error {
            return Err(AppError::new(code, message));
        }

        let steps = self.steps.clone();
        let flag = DropFlag(Arc::clone(&self.stream_drops));
        Ok(Box::pin(stream! {
            let _flag = flag;
            for step in steps {
                match step {
                    Step::Delta(delta) => yield Ok(delta),
                    Step::Fail(code, message) => {
                        yield Err(AppError::new(code, message));
                        return;
                    }
                    Step::Sleep(duration) => tokio::time::sleep(duration).await,
                    Step::Hang => futures_util::future::pending::<()>().await,
                }
            }
        }))
    }

    async fn chat(&self, _request: &ChatRequest) -> AppResult<String> {
        Ok(String::new())
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Chat and usage store kept in memory, with injectable faults and latency
#[derive(Default)]
pub struct MemoryStore {
    owners: Mutex<HashMap<ChatId, UserId>>,
    messages: Mutex<Vec<(ChatId, MessageId, NewMessage)>>,
    usage: Mutex<Vec<UsageRecord>>,
    fail_usage: AtomicBool,
    reply_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_chat(&self, user_id: UserId) -> ChatId {
        let chat_id = ChatId::new();
        self.owners.lock().unwrap().insert(chat_id, user_id);
        chat_id
    }

    pub fn seed(&self, chat_id: ChatId, message: NewMessage) {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, MessageId::new(), message));
    }

    pub fn messages(&self, chat_id: ChatId) -> Vec<NewMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _, _)| *chat == chat_id)
            .map(|(_, _, message)| message.clone())
            .collect()
    }

    pub fn usage(&self) -> Vec<UsageRecord> {
        self.usage.lock().unwrap().clone()
    }

    pub fn fail_usage_writes(&self) {
        self.fail_usage.store(true, Ordering::SeqCst);
    }

    /// Stall every assistant message write by `delay` before it lands
    pub fn delay_replies(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_chat_owned_by(&self, user_id: UserId, chat_id: ChatId) -> AppResult<ChatRecord> {
        match self.owners.lock().unwrap().get(&chat_id) {
            Some(owner) if *owner == user_id => Ok(ChatRecord {
                id: chat_id,
                user_id,
                title: "Test chat".to_owned(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }),
            _ => Err(AppError::chat_not_found(chat_id)),
        }
    }

    async fn append_message(&self, chat_id: ChatId, message: NewMessage) -> AppResult<MessageId> {
        let delay = *self.reply_delay.lock().unwrap();
        if let (MessageRole::Assistant, Some(delay)) = (message.role, delay) {
            tokio::time::sleep(delay).await;
        }
        let id = MessageId::new();
        self.messages.lock().unwrap().push((chat_id, id, message));
        Ok(id)
    }

    async fn list_turns(&self, chat_id: ChatId) -> AppResult<Vec<ConversationTurn>> {
        Ok(self
            .messages(chat_id)
            .into_iter()
            .map(|m| ConversationTurn::new(m.role, m.content))
            .collect())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn append(&self, record: &UsageRecord) -> AppResult<()> {
        if self.fail_usage.load(Ordering::SeqCst) {
            return Err(AppError::database("usage table unavailable"));
        }
        self.usage.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Settings with a short run timeout and generous limits
pub fn test_settings() -> OrchestratorSettings {
    let mut settings = OrchestratorSettings::default();
    settings.orchestration.worker_pool_size = 4;
    settings.orchestration.queue_depth = 4;
    settings.orchestration.run_timeout_secs = 5;
    settings
}

/// Orchestrator over a scripted provider and an in-memory store
pub fn orchestrator(
    provider: &Arc<ScriptedProvider>,
    store: &Arc<MemoryStore>,
    settings: OrchestratorSettings,
) -> ChatOrchestrator {
    init_test_logging();
    ChatOrchestrator::new(
        Arc::clone(provider) as Arc<dyn LlmProvider>,
        Arc::clone(store) as Arc<dyn ChatStore>,
        Arc::clone(store) as Arc<dyn UsageStore>,
        settings,
    )
}

/// Drain a run's events, failing the test if it does not finish in time
pub async fn collect_events(events: EventStream) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(10), events.collect::<Vec<_>>())
        .await
        .expect("event stream did not terminate")
}

/// Error code of a terminal error event
pub fn error_code(event: &StreamEvent) -> Option<ErrorCode> {
    match event {
        StreamEvent::Error { code, .. } => Some(*code),
        _ => None,
    }
}
