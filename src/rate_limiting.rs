// ABOUTME: Per-user fixed-window admission control for chat streaming requests
// ABOUTME: Uses sharded DashMap entries so users never contend with each other
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Chat Rate Limiting
//!
//! Each user gets a window of `window_secs` seconds in which at most
//! `max_requests` runs are admitted. State lives in process memory only and
//! starts fresh on restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chatline_core::models::UserId;
use dashmap::DashMap;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::errors::{AppError, AppResult};

/// Map size above which stale windows are swept on the next check
const CLEANUP_THRESHOLD: usize = 10_000;

/// Per-user request counter: user -> (`count`, `window_start`)
#[derive(Debug, Clone)]
pub struct ChatRateLimiter {
    windows: Arc<DashMap<UserId, (u32, Instant)>>,
    config: RateLimitConfig,
}

impl ChatRateLimiter {
    /// Create a limiter from configuration
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Configured limits
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or reject one request for `user_id` at the current time
    ///
    /// # Errors
    ///
    /// Returns `RATE_LIMITED` when the user has exceeded the window quota
    pub fn check(&self, user_id: UserId) -> AppResult<()> {
        self.check_at(user_id, Instant::now())
    }

    /// Admit or reject one request for `user_id` at `now`
    ///
    /// The entry guard serializes the reset, increment, and comparison for a
    /// single user.
    ///
    /// # Errors
    ///
    /// Returns `RATE_LIMITED` when the user has exceeded the window quota
    pub fn check_at(&self, user_id: UserId, now: Instant) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let window = self.config.window();

        let mut entry = self.windows.entry(user_id).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.saturating_duration_since(*window_start) >= window {
            *count = 0;
            *window_start = now;
        }
        *count = count.saturating_add(1);
        let current = *count;
        drop(entry);

        if self.windows.len() > CLEANUP_THRESHOLD {
            self.cleanup_stale(now, window);
        }

        if current > self.config.max_requests {
            debug!(user.id = %user_id, count = current, "Rate limit exceeded");
            return Err(AppError::rate_limited(
                self.config.max_requests,
                self.config.window_secs,
            ));
        }
        Ok(())
    }

    /// Requests counted in the user's current window
    #[must_use]
    pub fn current_count(&self, user_id: UserId) -> u32 {
        self.windows.get(&user_id).map_or(0, |entry| entry.0)
    }

    fn cleanup_stale(&self, now: Instant, window: Duration) {
        self.windows
            .retain(|_, (_, start)| now.saturating_duration_since(*start) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> ChatRateLimiter {
        ChatRateLimiter::new(RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs: 60,
        })
    }

    #[test]
    fn test_users_have_independent_windows() {
        let limiter = limiter(1);
        let now = Instant::now();
        let (alice, bob) = (UserId::new(), UserId::new());

        assert!(limiter.check_at(alice, now).is_ok());
        assert!(limiter.check_at(bob, now).is_ok());
        assert!(limiter.check_at(alice, now).is_err());
    }

    #[test]
    fn test_disabled_limiter_never_counts() {
        let limiter = ChatRateLimiter::new(RateLimitConfig {
            enabled: false,
            max_requests: 0,
            window_secs: 60,
        });
        let user = UserId::new();
        for _ in 0..5 {
            assert!(limiter.check(user).is_ok());
        }
        assert_eq!(limiter.current_count(user), 0);
    }
}
