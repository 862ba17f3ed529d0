// ABOUTME: Bounded worker pool executing orchestration runs on the tokio runtime
// ABOUTME: Caps concurrent runs and queued runs separately; overflow is rejected
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{AppError, AppResult};

/// Executor with `workers` concurrent slots and `queue_depth` waiting slots
#[derive(Debug, Clone)]
pub struct RunExecutor {
    workers: Arc<Semaphore>,
    admitted: Arc<Semaphore>,
    worker_count: usize,
    capacity: usize,
}

impl RunExecutor {
    /// Create a pool; a zero worker count is raised to one
    #[must_use]
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        let workers = workers.max(1);
        let capacity = workers.saturating_add(queue_depth);
        Self {
            workers: Arc::new(Semaphore::new(workers)),
            admitted: Arc::new(Semaphore::new(capacity)),
            worker_count: workers,
            capacity,
        }
    }

    /// Submit a run
    ///
    /// The run waits for a free worker; if `cancel` fires while it waits it
    /// is dropped without starting.
    ///
    /// # Errors
    ///
    /// Returns `SERVICE_UNAVAILABLE` when every worker and queue slot is taken
    pub fn submit<F>(&self, cancel: &CancellationToken, run: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::clone(&self.admitted).try_acquire_owned().map_err(|_| {
            AppError::unavailable(format!(
                "All {} run slots are busy, retry shortly",
                self.capacity
            ))
        })?;

        let workers = Arc::clone(&self.workers);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _slot = slot;
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Run cancelled while queued");
                    return;
                }
                permit = workers.acquire_owned() => permit,
            };
            let Ok(_permit) = permit else {
                return;
            };
            run.await;
        });
        Ok(())
    }

    /// Concurrent worker slots
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Worker plus queue slots
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs currently holding a worker
    #[must_use]
    pub fn active(&self) -> usize {
        self.worker_count - self.workers.available_permits()
    }

    /// Runs admitted and not yet finished, queued or active
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.admitted.available_permits()
    }
}
